#[cfg(test)]
mod tests {
    use std::io::{self, BufReader, Cursor, Read};

    use proptest::prelude::*;

    use parzip_core::compression::{
        CompressionCodec, CompressionError, compress_chunks, create_compressor,
        create_decompressor, decompress_stream, detect_codec, resolve_level,
    };

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------
    fn units(codec: CompressionCodec, data: &[u8], chunk: usize) -> Vec<Vec<u8>> {
        let compressor = create_compressor(codec, None).unwrap();
        compress_chunks(Cursor::new(data), chunk, compressor)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn decode(stream: &[u8], codec: Option<CompressionCodec>) -> Vec<u8> {
        let mut out = Vec::new();
        decompress_stream(Cursor::new(stream), &mut out, codec).unwrap();
        out
    }

    /// Hands out at most one byte per read, like a slow pipe.
    struct OneByteReader<R>(R);

    impl<R: Read> Read for OneByteReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let end = buf.len().min(1);
            self.0.read(&mut buf[..end])
        }
    }

    // ------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------
    #[test]
    fn codec_names_and_parsing() {
        assert_eq!("gzip".parse::<CompressionCodec>().unwrap(), CompressionCodec::Gzip);
        assert_eq!("GZ".parse::<CompressionCodec>().unwrap(), CompressionCodec::Gzip);
        assert_eq!("zstd".parse::<CompressionCodec>().unwrap(), CompressionCodec::Zstd);
        assert!(matches!(
            "lzma".parse::<CompressionCodec>(),
            Err(CompressionError::UnsupportedCodec { .. })
        ));
        assert_eq!(CompressionCodec::default(), CompressionCodec::Gzip);
        assert_eq!(CompressionCodec::Zstd.extension(), "zst");
    }

    #[test]
    fn level_bounds_per_codec() {
        assert_eq!(resolve_level(CompressionCodec::Gzip, None).unwrap(), 6);
        assert_eq!(resolve_level(CompressionCodec::Zstd, None).unwrap(), 3);
        assert!(resolve_level(CompressionCodec::Gzip, Some(9)).is_ok());
        assert!(matches!(
            resolve_level(CompressionCodec::Gzip, Some(10)),
            Err(CompressionError::InvalidLevel { .. })
        ));
        assert!(resolve_level(CompressionCodec::Zstd, Some(0)).is_err());
        assert!(resolve_level(CompressionCodec::Zstd, Some(22)).is_ok());
    }

    #[test]
    fn each_unit_is_self_contained() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 97) as u8).collect();
        for codec in [CompressionCodec::Gzip, CompressionCodec::Zstd] {
            let parts = units(codec, &data, 8192);
            assert_eq!(parts.len(), 3);
            for (i, unit) in parts.iter().enumerate() {
                let start = i * 8192;
                let end = (start + 8192).min(data.len());
                assert_eq!(decode(unit, Some(codec)), &data[start..end], "{codec} unit {i}");
            }
        }
    }

    #[test]
    fn concatenated_units_decode_fully() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 251) as u8).collect();
        for codec in [CompressionCodec::Gzip, CompressionCodec::Zstd] {
            let stream: Vec<u8> = units(codec, &data, 4096).concat();
            // Detected from the magic bytes.
            assert_eq!(decode(&stream, None), data, "{codec}");
        }
    }

    #[test]
    fn detect_codec_from_magic() {
        let gz = units(CompressionCodec::Gzip, b"hello", 4096).concat();
        let zst = units(CompressionCodec::Zstd, b"hello", 4096).concat();

        assert_eq!(detect_codec(&gz[..4]).unwrap(), Some(CompressionCodec::Gzip));
        assert_eq!(detect_codec(&zst[..4]).unwrap(), Some(CompressionCodec::Zstd));
        assert_eq!(detect_codec(&[]).unwrap(), None);
        assert!(matches!(detect_codec(b"PK\x03\x04"), Err(CompressionError::UnknownFormat)));
    }

    #[test]
    fn one_byte_reads_decode_with_and_without_codec() {
        let data: Vec<u8> = (0..30_000u32).map(|i| (i % 211) as u8).collect();
        for codec in [CompressionCodec::Gzip, CompressionCodec::Zstd] {
            let stream = units(codec, &data, 8192).concat();
            for explicit in [None, Some(codec)] {
                let mut out = Vec::new();
                let n = decompress_stream(OneByteReader(Cursor::new(stream.clone())), &mut out, explicit)
                    .unwrap_or_else(|e| panic!("{codec} ({explicit:?}): {e}"));
                assert_eq!(n, data.len() as u64);
                assert_eq!(out, data, "{codec} ({explicit:?})");
            }
        }

        let mut out = Vec::new();
        let empty = OneByteReader(Cursor::new(Vec::new()));
        assert_eq!(decompress_stream(empty, &mut out, Some(CompressionCodec::Zstd)).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn empty_input_decodes_to_empty_output() {
        assert!(decode(&[], None).is_empty());
        assert!(units(CompressionCodec::Gzip, &[], 4096).is_empty());
    }

    #[test]
    fn corrupt_stream_is_an_error() {
        let mut stream = units(CompressionCodec::Gzip, &[42u8; 10_000], 4096).concat();
        let mid = stream.len() / 2;
        stream.truncate(mid);
        let mut out = Vec::new();
        assert!(decompress_stream(Cursor::new(stream), &mut out, None).is_err());
    }

    #[test]
    fn decompressor_reports_byte_count() {
        let data = vec![3u8; 12_345];
        let stream = units(CompressionCodec::Zstd, &data, 4096).concat();
        let mut dec = create_decompressor(CompressionCodec::Zstd).unwrap();
        let mut input = BufReader::new(Cursor::new(stream));
        let mut out = Vec::new();
        assert_eq!(dec.decompress_all(&mut input, &mut out).unwrap(), 12_345);
        assert_eq!(out, data);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn chunked_roundtrip_any_size(
            data in proptest::collection::vec(any::<u8>(), 0..40_000),
            chunk in 1usize..10_000,
            zstd in any::<bool>(),
        ) {
            let codec = if zstd { CompressionCodec::Zstd } else { CompressionCodec::Gzip };
            let parts = units(codec, &data, chunk);
            prop_assert_eq!(parts.len(), data.len().div_ceil(chunk));
            prop_assert_eq!(decode(&parts.concat(), None), data);
        }
    }
}
