//! The engine: a schema cache plus encoder and decoder pools.
use {
    crate::{
        cache::SchemaCache,
        codec::Codec,
        config::Config,
        decoder::Decoder,
        encoder::Encoder,
        error::Result,
        io::{Detached, SliceSource, Source, StreamSource},
        pool::Pool,
        schema::Pack,
    },
    bytes::Bytes,
    core::fmt,
    std::{
        io::{Read, Write},
        sync::Arc,
    },
    tracing::debug,
};

type Logger = Arc<dyn Fn(&str) + Send + Sync>;

/// Independent encoding context.
///
/// Each engine owns its own schema cache and pools; engines never share state. An engine is
/// `Send + Sync` and meant to be shared by reference (or in an `Arc`) across threads.
///
/// ```
/// # #[cfg(feature = "derive")] {
/// use binpack::{Engine, Pack};
///
/// #[derive(Pack, Default, Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let engine = Engine::new();
/// let bytes = engine.encode(&Point { x: 1, y: -1 }).unwrap();
/// assert_eq!(bytes, [2, 1]);
///
/// let point: Point = engine.decode_value(&bytes).unwrap();
/// assert_eq!(point, Point { x: 1, y: -1 });
/// # }
/// ```
pub struct Engine {
    config: Config,
    schemas: SchemaCache,
    encoders: Pool<Encoder<Detached>>,
    decoders: Pool<Decoder<Detached>>,
    logger: Option<Logger>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("schemas", &self.schemas.len())
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: Config) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    /// The codec this engine uses for `T`.
    pub fn codec_for<T: Pack>(&self) -> Result<Arc<Codec>> {
        self.schemas.resolve::<T>()
    }

    /// Forward a message to the logging hook, if one was configured.
    pub fn log(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = &self.logger {
            match args.as_str() {
                Some(message) => logger(message),
                None => logger(&args.to_string()),
            }
        }
    }

    /// Encode `value` into a new buffer.
    pub fn encode<T: Pack>(&self, value: &T) -> Result<Vec<u8>> {
        let (mut encoder, _) = self.checkout_encoder().attach(Vec::with_capacity(64));
        let result = encoder.encode(&self.schemas, value);
        let (encoder, out) = encoder.detach();
        self.encoders.put(encoder);
        result.map(|()| out)
    }

    /// Encode `value` directly into `out`.
    ///
    /// Nothing is buffered; wrap unbuffered sinks in a [`std::io::BufWriter`].
    pub fn encode_to<T: Pack, W: Write>(&self, value: &T, out: W) -> Result<()> {
        let (mut encoder, _) = self.checkout_encoder().attach(out);
        let result = encoder.encode(&self.schemas, value);
        self.encoders.put(encoder.detach().0);
        result
    }

    /// Decode `data` into `dst`.
    pub fn decode<T: Pack>(&self, data: &[u8], dst: &mut T) -> Result<()> {
        self.decode_source(SliceSource::new(data), dst)
    }

    /// Decode `data` into `dst`. Byte buffers in `dst` that are [`Bytes`] share `data`'s
    /// allocation instead of copying.
    pub fn decode_shared<T: Pack>(&self, data: &Bytes, dst: &mut T) -> Result<()> {
        self.decode_source(SliceSource::from_shared(data), dst)
    }

    /// Decode one value from `reader` into `dst`.
    ///
    /// Exactly the bytes of one value are consumed, so consecutive values can be read from the
    /// same stream.
    pub fn decode_from<T: Pack, R: Read>(&self, reader: R, dst: &mut T) -> Result<()> {
        self.decode_source(StreamSource::new(reader), dst)
    }

    /// Decode `data` into a fresh `T`.
    pub fn decode_value<T: Pack + Default>(&self, data: &[u8]) -> Result<T> {
        let mut value = T::default();
        self.decode(data, &mut value)?;
        Ok(value)
    }

    fn decode_source<S: Source, T: Pack>(&self, source: S, dst: &mut T) -> Result<()> {
        let (mut decoder, _) = self.checkout_decoder().attach(source);
        let result = decoder.decode(&self.schemas, dst);
        self.decoders.put(decoder.detach().0);
        result
    }

    fn checkout_encoder(&self) -> Encoder<Detached> {
        self.encoders.get(|| Encoder::new(Detached))
    }

    fn checkout_decoder(&self) -> Decoder<Detached> {
        let limit = self.config.preallocation_size_limit();
        self.decoders
            .get(|| Decoder::new(Detached).with_preallocation_limit(limit))
    }
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    logger: Option<Logger>,
}

impl EngineBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Install a hook that receives messages passed to [`Engine::log`].
    pub fn logger(mut self, logger: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn build(self) -> Engine {
        let Self { config, logger } = self;
        debug!(
            cache_capacity = config.cache_capacity(),
            preallocation_size_limit = config.preallocation_size_limit(),
            pool_capacity = config.pool_capacity(),
            "building engine"
        );
        Engine {
            schemas: SchemaCache::new(config.cache_capacity()),
            encoders: Pool::new(config.pool_capacity()),
            decoders: Pool::new(config.pool_capacity()),
            config,
            logger,
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{BinaryMarshal, BoxError, Pack, error::Error, proptest_config::proptest_cfg},
        core::any::TypeId,
        parking_lot::Mutex,
        proptest::prelude::*,
        std::{
            collections::{BTreeMap, HashMap},
            io,
            rc::Rc,
            thread,
            time::Duration,
        },
    };

    #[derive(Pack, Debug, Default, PartialEq, Clone, proptest_derive::Arbitrary)]
    #[pack(internal)]
    struct Roman {
        name: String,
        timestamp: i64,
        payload: Vec<u8>,
        ssid: Vec<u32>,
    }

    #[derive(Pack, Debug, Default, PartialEq)]
    #[pack(internal)]
    struct S0 {
        a: String,
        b: String,
        c: i16,
    }

    #[derive(Pack, Debug, Default, PartialEq)]
    #[pack(internal, marshal)]
    struct Payload(Vec<u8>);

    impl BinaryMarshal for Payload {
        fn marshal_binary(&self) -> core::result::Result<Vec<u8>, BoxError> {
            if self.0.is_empty() {
                return Err("nothing to marshal".into());
            }
            Ok(self.0.clone())
        }

        fn unmarshal_binary(&mut self, data: &[u8]) -> core::result::Result<(), BoxError> {
            self.0 = data.to_vec();
            Ok(())
        }
    }

    #[derive(Pack, Debug, Default, PartialEq)]
    #[pack(internal)]
    struct WithPayload {
        payload: Option<Payload>,
    }

    #[derive(Pack, Debug, Default, PartialEq, Clone)]
    #[pack(internal)]
    struct Leaf {
        id: u16,
    }

    #[derive(Pack, Debug, Default, PartialEq, Clone, proptest_derive::Arbitrary)]
    #[pack(internal)]
    struct Complex {
        flags: Vec<bool>,
        scores: [i32; 3],
        ratio: f64,
        small: f32,
        labels: BTreeMap<String, u64>,
        nested: Option<Option<i8>>,
        text: Vec<String>,
    }

    #[derive(Pack, Debug, Default, PartialEq)]
    #[pack(internal)]
    struct Tuple(u8, #[pack(skip)] u64, String);

    #[derive(Pack, Debug, Default, Clone, PartialEq)]
    #[pack(internal)]
    struct Empty {}

    #[derive(Pack, Debug, Default, PartialEq)]
    #[pack(internal)]
    struct Generic<T> {
        items: Vec<T>,
        first: Option<T>,
    }

    #[derive(Pack, Debug, Default, PartialEq)]
    #[pack(internal)]
    struct Timed {
        elapsed: Duration,
        shared: Rc<String>,
    }

    fn roundtrip<T: Pack + Default + PartialEq + fmt::Debug>(engine: &Engine, value: &T) -> Vec<u8> {
        let bytes = engine.encode(value).unwrap();
        let decoded: T = engine.decode_value(&bytes).unwrap();
        assert_eq!(&decoded, value);
        bytes
    }

    fn roman() -> Roman {
        Roman {
            name: "Roman".into(),
            timestamp: 1357092245000000006,
            payload: b"hi".to_vec(),
            ssid: vec![1, 2, 3],
        }
    }

    #[test]
    fn roman_record_roundtrips() {
        let engine = Engine::new();
        let bytes = roundtrip(&engine, &roman());
        assert_eq!(&bytes[..6], &[5, b'R', b'o', b'm', b'a', b'n']);
        assert_eq!(&bytes[bytes.len() - 7..], &[2, b'h', b'i', 3, 1, 2, 3]);
    }

    #[test]
    fn struct_layout() {
        let engine = Engine::new();
        let value = S0 {
            a: "A".into(),
            b: "B".into(),
            c: 1,
        };
        assert_eq!(roundtrip(&engine, &value), [0x01, 0x41, 0x01, 0x42, 0x02]);
    }

    #[test]
    fn custom_marshal_payloads() {
        let engine = Engine::new();
        let value = WithPayload {
            payload: Some(Payload(vec![0x13])),
        };
        assert_eq!(roundtrip(&engine, &value), [0x01, 0x13]);

        // A nil custom pointer is an empty payload; decoding allocates and unmarshals it.
        let bytes = engine.encode(&WithPayload::default()).unwrap();
        assert_eq!(bytes, [0x00]);
        let decoded: WithPayload = engine.decode_value(&bytes).unwrap();
        assert_eq!(decoded.payload, Some(Payload(Vec::new())));
    }

    #[test]
    fn marshal_errors_surface() {
        let engine = Engine::new();
        let value = WithPayload {
            payload: Some(Payload(Vec::new())),
        };
        let err = engine.encode(&value).unwrap_err();
        assert!(matches!(&err, Error::Marshal(inner) if inner.to_string() == "nothing to marshal"));
    }

    #[test]
    fn nil_pointers() {
        let engine = Engine::new();
        assert!(matches!(engine.encode(&None::<u32>), Err(Error::NilType)));
        assert!(matches!(engine.encode(&()), Err(Error::NilType)));

        assert_eq!(roundtrip(&engine, &Some(Some(7u32))), [0, 0, 7]);
        assert_eq!(roundtrip(&engine, &Some(None::<u32>)), [0, 1]);

        let ptrs = vec![Some(Leaf { id: 1 }), None, Some(Leaf { id: 2 })];
        assert_eq!(roundtrip(&engine, &ptrs), [3, 0, 1, 1, 0, 2]);
    }

    #[test]
    fn nil_flag_clears_the_destination() {
        let engine = Engine::new();
        let mut dst = Some(Some(5u8));
        engine.decode(&[0, 1], &mut dst).unwrap();
        assert_eq!(dst, Some(None));
    }

    #[test]
    fn zero_length_collections() {
        let engine = Engine::new();
        assert_eq!(roundtrip(&engine, &String::new()), [0]);
        assert_eq!(roundtrip(&engine, &Vec::<u8>::new()), [0]);
        assert_eq!(roundtrip(&engine, &Vec::<Leaf>::new()), [0]);
        assert_eq!(roundtrip(&engine, &HashMap::<String, u8>::new()), [0]);

        let mut dst = vec![Leaf { id: 9 }];
        engine.decode(&[0], &mut dst).unwrap();
        assert!(dst.is_empty());
    }

    #[test]
    fn strings_of_every_size() {
        let engine = Engine::new();
        let long = "x".repeat(1025);
        for s in ["", "a", "hello, wörld ✓", long.as_str()] {
            roundtrip(&engine, &s.to_string());
        }
    }

    #[test]
    fn integer_extremes() {
        let engine = Engine::new();
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            roundtrip(&engine, &v);
        }
        assert_eq!(roundtrip(&engine, &-1i64), [0x01]);
        assert_eq!(roundtrip(&engine, &u64::MAX).len(), 10);
        roundtrip(&engine, &usize::MAX);
        roundtrip(&engine, &isize::MIN);
    }

    #[test]
    fn narrowing_overflow_is_an_error() {
        let engine = Engine::new();
        let bytes = engine.encode(&300u32).unwrap();
        let mut dst = 0u8;
        assert!(matches!(
            engine.decode(&bytes, &mut dst),
            Err(Error::IntegerOverflow { value: 300, target: "u8" })
        ));
    }

    #[test]
    fn maps_roundtrip() {
        let engine = Engine::new();
        let map: HashMap<String, Vec<i32>> = [
            ("a".to_string(), vec![1, -2]),
            ("b".to_string(), Vec::new()),
        ]
        .into_iter()
        .collect();
        roundtrip(&engine, &map);

        let ordered: BTreeMap<u8, String> = [(2, "two".to_string()), (1, "one".to_string())].into();
        assert_eq!(
            roundtrip(&engine, &ordered),
            [2, 1, 3, b'o', b'n', b'e', 2, 3, b't', b'w', b'o']
        );
    }

    #[test]
    fn tuple_generic_and_transparent_fields() {
        let engine = Engine::new();
        let bytes = engine.encode(&Tuple(1, 99, "t".into())).unwrap();
        assert_eq!(bytes, [1, 1, b't']);
        assert_eq!(engine.decode_value::<Tuple>(&bytes).unwrap(), Tuple(1, 0, "t".into()));

        let generic = Generic {
            items: vec!["x".to_string()],
            first: Some("y".to_string()),
        };
        roundtrip(&engine, &generic);
        roundtrip(&engine, &Generic::<u16> { items: vec![1, 2], first: None });

        let timed = Timed {
            elapsed: Duration::from_millis(1500),
            shared: Rc::new("rc".into()),
        };
        roundtrip(&engine, &timed);
        roundtrip(&engine, &Box::new(roman()));
    }

    #[test]
    fn large_collections() {
        let engine = Engine::new();
        let big: Vec<u64> = (0..10_000).collect();
        roundtrip(&engine, &big);
        let leaves: Vec<Leaf> = (0..10_000).map(|id| Leaf { id: id as u16 }).collect();
        roundtrip(&engine, &leaves);
    }

    #[test]
    fn shared_destinations_are_rejected_up_front() {
        let engine = Engine::new();
        let mut dst = Arc::new(0u32);
        let _other = Arc::clone(&dst);
        assert!(matches!(
            engine.decode(&[], &mut dst),
            Err(Error::NotAddressable { .. })
        ));

        let mut dst = vec![Arc::new(Leaf::default())];
        let keep = Arc::clone(&dst[0]);
        // Elements are rebuilt from defaults, so outstanding clones do not block decoding.
        engine.decode(&[1, 5], &mut dst).unwrap();
        assert_eq!(dst[0].id, 5);
        assert_eq!(keep.id, 0);
    }

    #[test]
    fn truncated_input() {
        let engine = Engine::new();
        let bytes = engine.encode(&roman()).unwrap();
        for len in 0..bytes.len() {
            assert!(matches!(
                engine.decode_value::<Roman>(&bytes[..len]),
                Err(Error::EndOfData)
            ));
        }
    }

    #[test]
    fn oversized_lengths_are_rejected() {
        let engine = Engine::with_config(Config::new().with_preallocation_size_limit(1024));
        // A count of 8192 with no elements behind it.
        assert!(matches!(
            engine.decode_value::<Vec<u64>>(&[0x80, 0x40]),
            Err(Error::PreallocationSizeLimit { needed: 65536, limit: 1024 })
        ));

        // Counts the input can back are decoded whatever the limit; streams cannot tell.
        let bytes = engine.encode(&vec![0u64; 1024]).unwrap();
        assert_eq!(engine.decode_value::<Vec<u64>>(&bytes).unwrap(), vec![0u64; 1024]);
        let mut dst = Vec::<u64>::new();
        assert!(matches!(
            engine.decode_from(bytes.as_slice(), &mut dst),
            Err(Error::PreallocationSizeLimit { needed: 8192, limit: 1024 })
        ));
        assert!(engine.decode_value::<Vec<u8>>(&engine.encode(&vec![0u8; 1024]).unwrap()).is_ok());
    }

    #[test]
    fn values_larger_than_the_preallocation_limit() {
        let engine = Engine::new();

        let blob = vec![7u8; 5 << 20];
        let bytes = engine.encode(&blob).unwrap();
        assert_eq!(engine.decode_value::<Vec<u8>>(&bytes).unwrap(), blob);

        let text = "x".repeat(5 << 20);
        let bytes = engine.encode(&text).unwrap();
        assert_eq!(engine.decode_value::<String>(&bytes).unwrap(), text);

        let wide: Vec<u64> = (0..600_000).collect();
        let bytes = engine.encode(&wide).unwrap();
        assert_eq!(engine.decode_value::<Vec<u64>>(&bytes).unwrap(), wide);

        let map: HashMap<u32, u64> = (0..300_000).map(|i| (i, u64::from(i) << 20)).collect();
        let bytes = engine.encode(&map).unwrap();
        assert_eq!(engine.decode_value::<HashMap<u32, u64>>(&bytes).unwrap(), map);
    }

    #[test]
    fn zero_sized_elements_cannot_claim_huge_counts() {
        let engine = Engine::new();
        let huge = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert!(matches!(
            engine.decode_value::<Vec<[u8; 0]>>(&huge),
            Err(Error::PreallocationSizeLimit { .. })
        ));
        assert!(matches!(
            engine.decode_value::<Vec<Empty>>(&huge),
            Err(Error::PreallocationSizeLimit { .. })
        ));
        assert!(matches!(
            engine.decode_value::<BTreeMap<[u8; 0], [u8; 0]>>(&huge),
            Err(Error::PreallocationSizeLimit { .. })
        ));

        let bytes = engine.encode(&vec![Empty {}; 3]).unwrap();
        assert_eq!(bytes, [3]);
        assert_eq!(engine.decode_value::<Vec<Empty>>(&bytes).unwrap().len(), 3);
    }

    #[test]
    fn byte_blobs_through_owning_pointers() {
        let engine = Engine::new();
        let plain = engine.encode(&vec![1u8, 200, 255]).unwrap();
        assert_eq!(plain, [3, 1, 200, 255]);

        let boxed = vec![Box::new(1u8), Box::new(200), Box::new(255)];
        assert_eq!(engine.encode(&boxed).unwrap(), plain);
        assert_eq!(engine.decode_value::<Vec<Box<u8>>>(&plain).unwrap(), boxed);

        let shared: Vec<std::sync::Arc<u8>> = [1, 200, 255].map(std::sync::Arc::new).into();
        assert_eq!(engine.encode(&shared).unwrap(), plain);
        assert_eq!(engine.decode_value::<Vec<std::sync::Arc<u8>>>(&plain).unwrap(), shared);

        let local = vec![Rc::new(1u8), Rc::new(200), Rc::new(255)];
        assert_eq!(engine.encode(&local).unwrap(), plain);
        assert_eq!(engine.decode_value::<Vec<Rc<u8>>>(&plain).unwrap(), local);

        assert!(matches!(
            engine.decode_value::<Vec<Box<u8>>>(&plain[..2]),
            Err(Error::EndOfData)
        ));
    }

    #[test]
    fn streaming_decode() {
        /// Yields at most one byte per `read` call.
        struct Trickle<'a>(&'a [u8]);

        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match (self.0.split_first(), buf.first_mut()) {
                    (Some((&byte, rest)), Some(slot)) => {
                        *slot = byte;
                        self.0 = rest;
                        Ok(1)
                    }
                    _ => Ok(0),
                }
            }
        }

        let engine = Engine::new();
        let mut stream = Vec::new();
        engine.encode_to(&roman(), &mut stream).unwrap();
        engine.encode_to(&S0::default(), &mut stream).unwrap();

        let mut reader = Trickle(&stream);
        let mut first = Roman::default();
        engine.decode_from(&mut reader, &mut first).unwrap();
        let mut second = S0 {
            a: "stale".into(),
            ..S0::default()
        };
        engine.decode_from(&mut reader, &mut second).unwrap();
        assert_eq!(first, roman());
        assert_eq!(second, S0::default());
        assert!(reader.0.is_empty());
    }

    #[test]
    fn sink_failures_surface_as_write_errors() {
        struct Full;

        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::StorageFull, "full"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let engine = Engine::new();
        let err = engine.encode_to(&roman(), Full).unwrap_err();
        assert!(matches!(err, Error::Write(e) if e.kind() == io::ErrorKind::StorageFull));
        // The encoder went back to the pool clean.
        assert_eq!(engine.encoders.idle(), 1);
        assert!(engine.encode(&roman()).is_ok());
    }

    #[test]
    fn pools_are_reused() {
        let engine = Engine::new();
        for _ in 0..10 {
            let bytes = engine.encode(&roman()).unwrap();
            engine.decode_value::<Roman>(&bytes).unwrap();
        }
        assert_eq!(engine.encoders.idle(), 1);
        assert_eq!(engine.decoders.idle(), 1);
    }

    #[test]
    fn engines_are_isolated() {
        let a = Engine::new();
        let b = Engine::new();
        a.encode(&roman()).unwrap();
        assert!(a.schemas().contains(TypeId::of::<Roman>()));
        assert!(!b.schemas().contains(TypeId::of::<Roman>()));
        assert!(Arc::ptr_eq(
            &a.codec_for::<Roman>().unwrap(),
            &a.codec_for::<Roman>().unwrap()
        ));
    }

    #[test]
    fn concurrent_use() {
        let engine = Engine::new();
        let expected = engine.encode(&roman()).unwrap();
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let bytes = engine.encode(&roman()).unwrap();
                        assert_eq!(bytes, expected);
                        assert_eq!(engine.decode_value::<Roman>(&bytes).unwrap(), roman());
                    }
                });
            }
        });
        assert!(engine.encoders.idle() <= engine.config().pool_capacity());
    }

    #[test]
    fn logger_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let engine = Engine::builder()
            .logger(move |message| sink.lock().push(message.to_string()))
            .build();
        engine.log(format_args!("static"));
        engine.log(format_args!("value {}", 42));
        Engine::new().log(format_args!("dropped"));
        assert_eq!(*seen.lock(), ["static", "value 42"]);
    }

    proptest! {
        #![proptest_config(proptest_cfg())]

        #[test]
        fn test_roman_roundtrip(value: Roman) {
            let engine = Engine::new();
            let bytes = engine.encode(&value).unwrap();
            prop_assert_eq!(engine.decode_value::<Roman>(&bytes).unwrap(), value.clone());
            let mut streamed = Roman::default();
            engine.decode_from(bytes.as_slice(), &mut streamed).unwrap();
            prop_assert_eq!(streamed, value);
        }

        #[test]
        fn test_complex_roundtrip(value: Complex) {
            let engine = Engine::new();
            let bytes = engine.encode(&value).unwrap();
            let decoded: Complex = engine.decode_value(&bytes).unwrap();
            // NaN never compares equal; compare the encodings instead.
            prop_assert_eq!(engine.encode(&decoded).unwrap(), bytes);
        }
    }
}
