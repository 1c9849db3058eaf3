use anyhow::Context;
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens `input` for reading; `stdin` reads standard input and a `.gz`
/// extension is decompressed on the fly (bgzip included).
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    #[test]
    fn test_gz_round() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.g.vcf.gz");

        let mut encoder = GzEncoder::new(
            std::fs::File::create(&path).unwrap(),
            Compression::default(),
        );
        encoder.write_all(b"line1\nline2\n").unwrap();
        encoder.finish().unwrap();

        let lines: Vec<String> = reader(path.to_str().unwrap())
            .unwrap()
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines, vec!["line1", "line2"]);

        assert!(reader("tests/gvcf/does_not_exist.g.vcf").is_err());
    }
}
