use quarry_collections::{
    BYTE_BLOCK_SIZE, ByteBlockPool, BytesRefHash, INT_BLOCK_SIZE, IntBlockPool,
    RecyclingAllocator, SliceReader, SliceWriter, TermOrd,
};

/// Per-term postings kept next to a hash, addressed by ordinal.
#[derive(Default, Clone, Copy)]
struct Chain {
    start: u32,
    end: u32,
    freq: u32,
}

fn index_tokens(
    tokens: &[&str],
    bytes: &mut ByteBlockPool,
    ints: &mut IntBlockPool,
    hash: &mut BytesRefHash,
    chains: &mut Vec<Chain>,
) {
    let mut writer = SliceWriter::new(ints);
    for (pos, token) in tokens.iter().enumerate() {
        let ord = match hash.add(bytes, token.as_bytes()).unwrap() {
            TermOrd::New(ord) => {
                let start = writer.start_new_slice().unwrap();
                chains.push(Chain {
                    start,
                    end: start,
                    freq: 0,
                });
                ord
            }
            TermOrd::Existing(ord) => {
                writer.reset(chains[ord as usize].end);
                ord
            }
        };
        writer.write_int(pos as i32).unwrap();
        let chain = &mut chains[ord as usize];
        chain.end = writer.current_offset();
        chain.freq += 1;
    }
}

fn positions(ints: &IntBlockPool, chain: Chain) -> Vec<i32> {
    let mut reader = SliceReader::new(ints);
    reader.reset(chain.start, chain.end);
    let mut out = Vec::new();
    while !reader.end_of_slice() {
        out.push(reader.read_int());
    }
    out
}

#[test]
fn test_two_hashes_share_one_arena() {
    let mut bytes = ByteBlockPool::direct();
    let mut ints = IntBlockPool::direct();
    let mut title = BytesRefHash::new();
    let mut body = BytesRefHash::new();
    let mut title_chains = Vec::new();
    let mut body_chains = Vec::new();

    index_tokens(
        &["the", "quick", "fox"],
        &mut bytes,
        &mut ints,
        &mut title,
        &mut title_chains,
    );
    index_tokens(
        &["the", "lazy", "dog", "and", "the", "fox"],
        &mut bytes,
        &mut ints,
        &mut body,
        &mut body_chains,
    );

    let the = body.find(&bytes, b"the").unwrap();
    assert_eq!(body_chains[the as usize].freq, 2);
    assert_eq!(positions(&ints, body_chains[the as usize]), vec![0, 4]);

    let fox = title.find(&bytes, b"fox").unwrap();
    assert_eq!(positions(&ints, title_chains[fox as usize]), vec![2]);
    assert_eq!(title.find(&bytes, b"lazy"), None);

    let sorted: Vec<&[u8]> = body
        .sort(&bytes, |a, b| a.cmp(b))
        .into_iter()
        .map(|ord| body.get(&bytes, ord))
        .collect();
    assert_eq!(sorted, vec![&b"and"[..], b"dog", b"fox", b"lazy", b"the"]);
}

#[test]
fn test_random_postings_round_trip() {
    let mut rng = fastrand::Rng::with_seed(42);
    let vocabulary: Vec<String> = (0..300)
        .map(|i| {
            let len = rng.usize(1..20);
            let suffix: String = (0..len).map(|_| rng.lowercase()).collect();
            format!("{i}{suffix}")
        })
        .collect();
    let tokens: Vec<&str> = (0..40_000)
        .map(|_| vocabulary[rng.usize(..vocabulary.len())].as_str())
        .collect();

    let mut bytes = ByteBlockPool::direct();
    let mut ints = IntBlockPool::direct();
    let mut hash = BytesRefHash::new();
    let mut chains = Vec::new();
    index_tokens(&tokens, &mut bytes, &mut ints, &mut hash, &mut chains);
    assert!(ints.num_blocks() >= 3);

    for (ord, chain) in chains.iter().enumerate() {
        let term = hash.get(&bytes, ord as u32);
        let expected: Vec<i32> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.as_bytes() == term)
            .map(|(pos, _)| pos as i32)
            .collect();
        assert_eq!(chain.freq as usize, expected.len());
        assert_eq!(positions(&ints, *chain), expected);
    }
}

#[test]
fn test_pools_reuse_blocks_after_reset() {
    let mut bytes = ByteBlockPool::new(RecyclingAllocator::new(BYTE_BLOCK_SIZE, 2));
    let mut ints = IntBlockPool::new(RecyclingAllocator::new(INT_BLOCK_SIZE, 2));
    let tokens: Vec<String> = (0..20_000).map(|i| format!("t{}", i % 97)).collect();
    let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();

    let mut first_usage = None;
    for _ in 0..3 {
        let mut hash = BytesRefHash::new();
        let mut chains = Vec::new();
        index_tokens(&tokens, &mut bytes, &mut ints, &mut hash, &mut chains);
        assert_eq!(hash.len(), 97);
        let t5 = hash.find(&bytes, b"t5").unwrap();
        assert_eq!(positions(&ints, chains[t5 as usize])[..2], [5, 102]);

        let usage = bytes.bytes_used() + ints.bytes_used();
        assert_eq!(*first_usage.get_or_insert(usage), usage);

        bytes.reset(false, false);
        ints.reset(true, false);
    }
}
