use git_pack::delta::{apply_delta, encode_copy, encode_insert, write_varint};
use proptest::prelude::*;

/// One step of a generated delta: copy a base range, or insert literal bytes.
#[derive(Debug, Clone)]
enum Step {
    Copy { start: usize, len: usize },
    Insert(Vec<u8>),
}

fn step(base_len: usize) -> impl Strategy<Value = Step> {
    let copy = (0..base_len)
        .prop_flat_map(move |start| (Just(start), 1..=base_len - start))
        .prop_map(|(start, len)| Step::Copy { start, len });
    let insert = prop::collection::vec(any::<u8>(), 1..300).prop_map(Step::Insert);
    prop_oneof![copy, insert]
}

fn case() -> impl Strategy<Value = (Vec<u8>, Vec<Step>)> {
    prop::collection::vec(any::<u8>(), 1..2048).prop_flat_map(|base| {
        let steps = prop::collection::vec(step(base.len()), 0..24);
        (Just(base), steps)
    })
}

proptest! {
    #[test]
    fn delta_reproduces_target((base, steps) in case()) {
        let mut expected = Vec::new();
        let mut ops = Vec::new();
        for step in &steps {
            match step {
                Step::Copy { start, len } => {
                    expected.extend_from_slice(&base[*start..start + len]);
                    ops.extend(encode_copy(*start as u32, *len));
                }
                Step::Insert(data) => {
                    expected.extend_from_slice(data);
                    ops.extend(encode_insert(data));
                }
            }
        }

        let mut delta = write_varint(base.len() as u64);
        delta.extend(write_varint(expected.len() as u64));
        delta.extend(ops);
        prop_assert_eq!(apply_delta(&base, &delta).unwrap(), expected);
    }

    #[test]
    fn wrong_target_size_is_rejected((base, steps) in case(), extra in 1u64..10) {
        let mut len = 0u64;
        let mut ops = Vec::new();
        for step in &steps {
            match step {
                Step::Copy { start, len: n } => {
                    len += *n as u64;
                    ops.extend(encode_copy(*start as u32, *n));
                }
                Step::Insert(data) => {
                    len += data.len() as u64;
                    ops.extend(encode_insert(data));
                }
            }
        }
        let mut delta = write_varint(base.len() as u64);
        delta.extend(write_varint(len + extra));
        delta.extend(ops);
        prop_assert!(apply_delta(&base, &delta).is_err());
    }

    #[test]
    fn arbitrary_bytes_never_panic(base in prop::collection::vec(any::<u8>(), 0..64),
                                   delta in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = apply_delta(&base, &delta);
    }
}
