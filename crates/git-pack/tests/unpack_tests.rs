use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use git_hash::{Hasher, ObjectId};
use git_loose::LooseObjectStore;
use git_object::{hash_object, ObjectType};
use git_pack::delta::{encode_copy, encode_insert, write_varint};
use git_pack::entry::{encode_entry_header, encode_ofs_distance};
use git_pack::{unpack, PackEntryType, PackError, UnpackOptions};

/// Assembles a pack in memory, one record at a time.
struct PackBuilder {
    body: Vec<u8>,
    count: u32,
}

impl PackBuilder {
    fn new() -> Self {
        Self {
            body: Vec::new(),
            count: 0,
        }
    }

    fn next_offset(&self) -> u64 {
        12 + self.body.len() as u64
    }

    fn record(&mut self, type_num: u8, base_ref: &[u8], payload: &[u8]) -> u64 {
        let offset = self.next_offset();
        self.body
            .extend_from_slice(&encode_entry_header(type_num, payload.len() as u64));
        self.body.extend_from_slice(base_ref);
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(payload).unwrap();
        self.body.extend_from_slice(&enc.finish().unwrap());
        self.count += 1;
        offset
    }

    fn whole(&mut self, kind: ObjectType, payload: &[u8]) -> u64 {
        self.record(PackEntryType::from(kind).type_number(), &[], payload)
    }

    fn ref_delta(&mut self, base: ObjectId, delta: &[u8]) -> u64 {
        self.record(7, base.as_bytes(), delta)
    }

    fn ofs_delta(&mut self, base_offset: u64, delta: &[u8]) -> u64 {
        let distance = self.next_offset() - base_offset;
        self.record(6, &encode_ofs_distance(distance), delta)
    }

    fn build_declaring(&self, count: u32) -> Vec<u8> {
        let mut pack = b"PACK".to_vec();
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&count.to_be_bytes());
        pack.extend_from_slice(&self.body);
        let trailer = Hasher::digest(&pack).unwrap();
        pack.extend_from_slice(trailer.as_bytes());
        pack
    }

    fn build(&self) -> Vec<u8> {
        self.build_declaring(self.count)
    }
}

fn delta(source_len: usize, target_len: usize, ops: &[Vec<u8>]) -> Vec<u8> {
    let mut d = write_varint(source_len as u64);
    d.extend_from_slice(&write_varint(target_len as u64));
    for op in ops {
        d.extend_from_slice(op);
    }
    d
}

fn store() -> (tempfile::TempDir, LooseObjectStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LooseObjectStore::open(dir.path().join("objects"));
    (dir, store)
}

fn strict() -> UnpackOptions {
    UnpackOptions {
        verify_checksum: true,
    }
}

#[test]
fn single_blob() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"hello world");

    let summary = unpack(&pack.build(), &store, &strict()).unwrap();
    let expected = ObjectId::from_hex("95d09f2b10159347eece71399a7e2e907ea3df4f").unwrap();
    assert_eq!(summary.objects, 1);
    assert_eq!(summary.deltas, 0);
    assert_eq!(summary.stored_ids, vec![expected]);
    assert_eq!(
        store.get(&expected).unwrap(),
        (ObjectType::Blob, b"hello world".to_vec())
    );
}

#[test]
fn commit_tree_and_blob() {
    let (_dir, store) = store();
    let blob = b"file contents\n".to_vec();
    let blob_id = hash_object(ObjectType::Blob, &blob).unwrap();
    let mut tree = b"100644 file.txt\0".to_vec();
    tree.extend_from_slice(blob_id.as_bytes());
    let tree_id = hash_object(ObjectType::Tree, &tree).unwrap();
    let commit = format!(
        "tree {tree_id}\nauthor A <a@example.com> 0 +0000\ncommitter A <a@example.com> 0 +0000\n\ninitial\n"
    )
    .into_bytes();
    let commit_id = hash_object(ObjectType::Commit, &commit).unwrap();

    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Commit, &commit);
    pack.whole(ObjectType::Tree, &tree);
    pack.whole(ObjectType::Blob, &blob);

    let summary = unpack(&pack.build(), &store, &strict()).unwrap();
    assert_eq!(summary.stored_ids, vec![commit_id, tree_id, blob_id]);
    assert_eq!(store.get(&commit_id).unwrap().0, ObjectType::Commit);
    assert_eq!(store.read_tree(&tree_id).unwrap().len(), 1);
    assert_eq!(store.get(&blob_id).unwrap().1, blob);
}

#[test]
fn tag_records_are_stored() {
    let (_dir, store) = store();
    let payload = b"object 95d09f2b10159347eece71399a7e2e907ea3df4f\ntype blob\ntag v1\n\nmsg\n";
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Tag, payload);

    let summary = unpack(&pack.build(), &store, &UnpackOptions::default()).unwrap();
    assert_eq!(store.get(&summary.stored_ids[0]).unwrap().0, ObjectType::Tag);
}

#[test]
fn ref_delta_against_blob_in_pack() {
    let (_dir, store) = store();
    let base = b"Hello, World!";
    let base_id = hash_object(ObjectType::Blob, base).unwrap();

    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, base);
    pack.ref_delta(base_id, &delta(13, 5, &[encode_copy(0, 5)]));

    let summary = unpack(&pack.build(), &store, &strict()).unwrap();
    let hello_id = hash_object(ObjectType::Blob, b"Hello").unwrap();
    assert_eq!(summary.deltas, 1);
    assert_eq!(summary.stored_ids, vec![base_id, hello_id]);
    assert_eq!(
        store.get(&hello_id).unwrap(),
        (ObjectType::Blob, b"Hello".to_vec())
    );
}

#[test]
fn ref_delta_before_its_base() {
    let (_dir, store) = store();
    let base = b"Hello, World!";
    let base_id = hash_object(ObjectType::Blob, base).unwrap();

    let mut pack = PackBuilder::new();
    pack.ref_delta(
        base_id,
        &delta(13, 12, &[encode_copy(0, 7), encode_insert(b"Rust!")]),
    );
    pack.whole(ObjectType::Blob, base);

    unpack(&pack.build(), &store, &strict()).unwrap();
    let target = hash_object(ObjectType::Blob, b"Hello, Rust!").unwrap();
    assert!(store.contains(&target));
}

#[test]
fn ref_delta_chain_resolves_over_rounds() {
    let (_dir, store) = store();
    let base = b"aaaa";
    let base_id = hash_object(ObjectType::Blob, base).unwrap();
    let middle = b"aaaabbbb";
    let middle_id = hash_object(ObjectType::Blob, middle).unwrap();

    // The second-level delta comes first and must wait for the first.
    let mut pack = PackBuilder::new();
    pack.ref_delta(
        middle_id,
        &delta(8, 12, &[encode_copy(0, 8), encode_insert(b"cccc")]),
    );
    pack.ref_delta(base_id, &delta(4, 8, &[encode_copy(0, 4), encode_insert(b"bbbb")]));
    pack.whole(ObjectType::Blob, base);

    let summary = unpack(&pack.build(), &store, &strict()).unwrap();
    assert_eq!(summary.deltas, 2);
    let top = hash_object(ObjectType::Blob, b"aaaabbbbcccc").unwrap();
    assert_eq!(summary.stored_ids.last(), Some(&top));
}

#[test]
fn ref_delta_against_existing_object() {
    let (_dir, store) = store();
    let base_id = store.put(ObjectType::Blob, b"already here").unwrap();

    let mut pack = PackBuilder::new();
    pack.ref_delta(base_id, &delta(12, 7, &[encode_copy(0, 7)]));

    unpack(&pack.build(), &store, &strict()).unwrap();
    let target = hash_object(ObjectType::Blob, b"already").unwrap();
    assert_eq!(store.get(&target).unwrap().1, b"already");
}

#[test]
fn ofs_delta_chain_inherits_kind() {
    let (_dir, store) = store();
    let tree_payload = {
        let mut t = b"100644 a\0".to_vec();
        t.extend_from_slice(&[0x11; 20]);
        t
    };
    let mut pack = PackBuilder::new();
    let base_at = pack.whole(ObjectType::Tree, &tree_payload);

    let mut second = b"100644 b\0".to_vec();
    second.extend_from_slice(&[0x22; 20]);
    let first_delta = delta(
        tree_payload.len(),
        tree_payload.len() + second.len(),
        &[encode_copy(0, tree_payload.len()), encode_insert(&second)],
    );
    let middle_at = pack.ofs_delta(base_at, &first_delta);
    let grown = [tree_payload.clone(), second.clone()].concat();
    let second_delta = delta(grown.len(), second.len(), &[encode_copy(29, 29)]);
    pack.ofs_delta(middle_at, &second_delta);

    let summary = unpack(&pack.build(), &store, &strict()).unwrap();
    assert_eq!(summary.deltas, 2);
    assert_eq!(summary.stored_ids.len(), 3);

    let grown_id = hash_object(ObjectType::Tree, &grown).unwrap();
    let tail_id = hash_object(ObjectType::Tree, &second).unwrap();
    assert_eq!(store.read_tree(&grown_id).unwrap().len(), 2);
    assert_eq!(store.get(&tail_id).unwrap(), (ObjectType::Tree, second));
}

#[test]
fn ofs_delta_into_middle_of_record() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    let base_at = pack.whole(ObjectType::Blob, b"base");
    pack.ofs_delta(base_at + 1, &delta(4, 4, &[encode_copy(0, 4)]));

    assert!(matches!(
        unpack(&pack.build(), &store, &strict()),
        Err(PackError::CorruptEntry { .. })
    ));
}

#[test]
fn unresolved_ref_delta() {
    let (_dir, store) = store();
    let missing = ObjectId::from([0x42; 20]);
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"unrelated");
    pack.ref_delta(missing, &delta(3, 3, &[encode_copy(0, 3)]));

    match unpack(&pack.build(), &store, &strict()) {
        Err(PackError::UnresolvedDeltas { count, missing: m }) => {
            assert_eq!(count, 1);
            assert_eq!(m, missing.to_hex());
        }
        other => panic!("expected UnresolvedDeltas, got {other:?}"),
    }
}

#[test]
fn corrupt_delta_reports_record_offset() {
    let (_dir, store) = store();
    let base_id = hash_object(ObjectType::Blob, b"abc").unwrap();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"abc");
    let at = pack.ref_delta(base_id, &delta(3, 10, &[encode_copy(0, 10)]));

    match unpack(&pack.build(), &store, &strict()) {
        Err(PackError::InvalidDelta { offset, .. }) => assert_eq!(offset, at),
        other => panic!("expected InvalidDelta, got {other:?}"),
    }
}

#[test]
fn more_objects_declared_than_present() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"only one");

    let mut bytes = pack.build_declaring(3);
    assert!(unpack(&bytes, &store, &UnpackOptions::default()).is_err());

    bytes.truncate(bytes.len() - 20);
    assert!(matches!(
        unpack(&bytes, &store, &UnpackOptions::default()),
        Err(PackError::Truncated(_))
    ));
}

#[test]
fn missing_trailer() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"x");
    let mut bytes = pack.build();
    bytes.truncate(bytes.len() - 5);

    assert!(matches!(
        unpack(&bytes, &store, &UnpackOptions::default()),
        Err(PackError::Truncated(_))
    ));
}

#[test]
fn bytes_after_trailer_are_rejected() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"x");
    let mut bytes = pack.build();
    bytes.extend_from_slice(b"junk");

    for options in [UnpackOptions::default(), strict()] {
        match unpack(&bytes, &store, &options) {
            Err(PackError::CorruptEntry { reason, .. }) => {
                assert!(reason.contains("4 bytes after the last declared object"), "{reason}")
            }
            other => panic!("expected CorruptEntry, got {other:?}"),
        }
    }
    assert!(!store.contains(&hash_object(ObjectType::Blob, b"x").unwrap()));
}

#[test]
fn undeclared_record_is_rejected() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"declared");
    pack.whole(ObjectType::Blob, b"not declared");
    let bytes = pack.build_declaring(1);

    let result = unpack(&bytes, &store, &UnpackOptions::default());
    assert!(
        matches!(result, Err(PackError::CorruptEntry { .. })),
        "{result:?}"
    );
    assert!(!store.contains(&hash_object(ObjectType::Blob, b"declared").unwrap()));
    assert!(!store.contains(&hash_object(ObjectType::Blob, b"not declared").unwrap()));
}

#[test]
fn checksum_only_checked_in_strict_mode() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"payload");
    let mut bytes = pack.build();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    assert!(matches!(
        unpack(&bytes, &store, &strict()),
        Err(PackError::ChecksumMismatch { .. })
    ));
    assert!(unpack(&bytes, &store, &UnpackOptions::default()).is_ok());
}

#[test]
fn bad_magic_and_version() {
    let (_dir, store) = store();
    let mut bytes = PackBuilder::new().build();
    bytes[0] = b'X';
    assert!(matches!(
        unpack(&bytes, &store, &UnpackOptions::default()),
        Err(PackError::InvalidHeader(_))
    ));

    let mut bytes = PackBuilder::new().build();
    bytes[7] = 9;
    assert!(matches!(
        unpack(&bytes, &store, &UnpackOptions::default()),
        Err(PackError::UnsupportedVersion(9))
    ));
}

#[test]
fn unpacking_twice_is_idempotent() {
    let (_dir, store) = store();
    let mut pack = PackBuilder::new();
    pack.whole(ObjectType::Blob, b"same");
    let bytes = pack.build();

    let first = unpack(&bytes, &store, &strict()).unwrap();
    let second = unpack(&bytes, &store, &strict()).unwrap();
    assert_eq!(first, second);
}
