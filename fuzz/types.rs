#[derive(Pack, Debug, Default, PartialEq)]
struct Header {
    version: u8,
    flags: Vec<bool>,
    tags: BTreeMap<String, i32>,
}

#[derive(Pack, Debug, Default, PartialEq)]
struct Record {
    header: Header,
    id: u64,
    delta: i64,
    name: String,
    payload: Vec<u8>,
    samples: Vec<u32>,
    parent: Option<Box<Header>>,
    children: Vec<Option<Header>>,
    window: [i16; 4],
    elapsed: Duration,
    ratio: f64,
}
