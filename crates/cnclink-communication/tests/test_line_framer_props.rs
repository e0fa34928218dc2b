use cnclink_communication::LineFramer;
use proptest::prelude::*;

fn encode(lines: &[String], crlf: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (line, use_crlf) in lines.iter().zip(crlf.iter().cycle()) {
        bytes.extend_from_slice(line.as_bytes());
        if *use_crlf {
            bytes.extend_from_slice(b"\r\n");
        } else {
            bytes.push(b'\n');
        }
    }
    bytes
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_lines(
        lines in prop::collection::vec("[^\r\n]{1,24}", 0..16),
        crlf in prop::collection::vec(any::<bool>(), 1..8),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let bytes = encode(&lines, &crlf);

        let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
        offsets.push(0);
        offsets.push(bytes.len());
        offsets.sort_unstable();
        offsets.dedup();

        let mut framer = LineFramer::new();
        let mut received = Vec::new();
        for window in offsets.windows(2) {
            received.extend(framer.push(&bytes[window[0]..window[1]]));
        }

        prop_assert_eq!(received, lines);
        prop_assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn prop_trailing_partial_line_is_held(
        line in "[^\r\n]{1,32}",
    ) {
        let mut framer = LineFramer::new();
        prop_assert!(framer.push(line.as_bytes()).is_empty());
        prop_assert_eq!(framer.pending(), line.len());
        prop_assert_eq!(framer.push(b"\n"), vec![line]);
    }
}
