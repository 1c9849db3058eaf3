use crate::libs::record::{Block, Call};
use anyhow::{anyhow, bail};
use log::debug;
use noodles::vcf::Header;
use std::io::BufRead;

/// A call on one side, with its contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GvcfRecord {
    pub contig: String,
    pub call: Call,
}

/// Line reader over a single-sample gVCF.
///
/// The header is consumed on construction so that the `##contig` order is
/// known before the first record is requested.
pub struct GvcfReader<R> {
    reader: R,
    line_buf: String,
    line_no: usize,
    pending: Option<String>,
    contigs: Vec<String>,
    keep_filtered: bool,
}

impl<R: BufRead> GvcfReader<R> {
    pub fn new(reader: R) -> anyhow::Result<Self> {
        let mut gvcf = Self {
            reader,
            line_buf: String::new(),
            line_no: 0,
            pending: None,
            contigs: vec![],
            keep_filtered: false,
        };
        gvcf.read_header()?;
        Ok(gvcf)
    }

    /// Also yield records whose FILTER is neither `.` nor `PASS`.
    pub fn keep_filtered(mut self, keep: bool) -> Self {
        self.keep_filtered = keep;
        self
    }

    /// Contigs in the order of the `##contig` header lines.
    pub fn contigs(&self) -> &[String] {
        &self.contigs
    }

    fn read_line(&mut self) -> std::io::Result<usize> {
        self.line_buf.clear();
        let n = self.reader.read_line(&mut self.line_buf)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n)
    }

    fn read_header(&mut self) -> anyhow::Result<()> {
        let mut header_str = String::new();
        loop {
            if self.read_line()? == 0 {
                break;
            }
            let line = self.line_buf.trim_end();
            if line.starts_with('#') {
                header_str.push_str(line);
                header_str.push('\n');
                if line.starts_with("#CHROM") {
                    break;
                }
            } else if !line.is_empty() {
                // first record, or headerless input
                self.pending = Some(line.to_string());
                break;
            }
        }

        if header_str.is_empty() {
            return Ok(());
        }
        let header: Header = header_str
            .parse()
            .map_err(|e| anyhow!("Invalid VCF header: {}", e))?;
        self.contigs = header.contigs().keys().map(|id| id.to_string()).collect();

        Ok(())
    }

    fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        loop {
            if self.read_line()? == 0 {
                return Ok(None);
            }
            let line = self.line_buf.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Ok(Some(line.to_string()));
        }
    }
}

impl<R: BufRead> Iterator for GvcfReader<R> {
    type Item = anyhow::Result<GvcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };

            match parse_line(&line) {
                Ok(parsed) => {
                    if !self.keep_filtered && !parsed.passed {
                        debug!(
                            "Skip filtered record {}:{}",
                            parsed.record.contig,
                            parsed.record.call.start()
                        );
                        continue;
                    }
                    return Some(Ok(parsed.record));
                }
                Err(e) => return Some(Err(anyhow!("Line {}: {}", self.line_no, e))),
            }
        }
    }
}

struct ParsedLine {
    record: GvcfRecord,
    passed: bool,
}

/// Symbolic alleles marking a reference-confidence block.
pub fn is_block_allele(alt: &str) -> bool {
    let first = alt.split(',').next().unwrap_or("");
    first == "<NON_REF>" || first == "<*>"
}

fn parse_line(line: &str) -> anyhow::Result<ParsedLine> {
    // CHROM POS ID REF ALT QUAL FILTER INFO [FORMAT SAMPLE...]
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        bail!("Expected at least 8 columns, found {}", fields.len());
    }

    let contig = fields[0].to_string();
    let start: u64 = fields[1]
        .parse()
        .map_err(|_| anyhow!("Invalid POS: {}", fields[1]))?;
    let passed = matches!(fields[6], "." | "PASS");

    if !is_block_allele(fields[4]) {
        return Ok(ParsedLine {
            record: GvcfRecord {
                contig,
                call: Call::Variant { start },
            },
            passed,
        });
    }

    let end = match info_end(fields[7])? {
        Some(end) => end,
        None => start
            .checked_add(fields[3].len().max(1) as u64 - 1)
            .ok_or_else(|| {
                anyhow!("Block at POS {} runs past the end of the coordinate range", start)
            })?,
    };
    if end < start {
        bail!("END {} lies before POS {}", end, start);
    }

    if fields.len() < 10 {
        bail!("Block at {}:{} has no sample column", contig, start);
    }
    if fields.len() > 10 {
        bail!(
            "Block at {}:{} has {} samples, only single-sample gVCFs are supported",
            contig,
            start,
            fields.len() - 9
        );
    }
    let confidence = format_gq(fields[8], fields[9])?
        .ok_or_else(|| anyhow!("Block at {}:{} has no GQ value", contig, start))?;

    let block = Block::new(start, end, confidence)?;
    Ok(ParsedLine {
        record: GvcfRecord {
            contig,
            call: Call::Block(block),
        },
        passed,
    })
}

fn info_end(info: &str) -> anyhow::Result<Option<u64>> {
    for field in info.split(';') {
        if let Some(value) = field.strip_prefix("END=") {
            let end = value
                .parse()
                .map_err(|_| anyhow!("Invalid END: {}", value))?;
            return Ok(Some(end));
        }
    }
    Ok(None)
}

fn format_gq(format: &str, sample: &str) -> anyhow::Result<Option<u32>> {
    let idx = match format.split(':').position(|key| key == "GQ") {
        Some(idx) => idx,
        None => return Ok(None),
    };
    match sample.split(':').nth(idx) {
        None | Some(".") | Some("") => Ok(None),
        Some(value) => {
            let gq = value
                .parse()
                .map_err(|_| anyhow!("Invalid GQ: {}", value))?;
            Ok(Some(gq))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\
##fileformat=VCFv4.2
##contig=<ID=chr2,length=1000>
##contig=<ID=chr1,length=2000>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA12878
";

    fn read_all(input: &str) -> anyhow::Result<Vec<GvcfRecord>> {
        GvcfReader::new(input.as_bytes())?.collect()
    }

    #[test]
    fn test_parse_gvcf() {
        let input = format!(
            "{}{}",
            HEADER,
            "\
chr2\t1\t.\tA\t<NON_REF>\t.\t.\tEND=10\tGT:DP:GQ:MIN_DP\t0/0:30:99:28
chr2\t11\t.\tC\tT,<NON_REF>\t50.2\t.\t.\tGT:GQ\t0/1:45
chr2\t12\t.\tG\t<*>\t.\tPASS\t.\tGT:GQ\t0/0:20
"
        );
        let reader = GvcfReader::new(input.as_bytes()).unwrap();
        assert_eq!(reader.contigs(), &["chr2".to_string(), "chr1".to_string()]);

        let records: Vec<GvcfRecord> = reader.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].contig, "chr2");
        assert_eq!(records[0].call, Call::Block(Block::new(1, 10, 99).unwrap()));
        assert_eq!(records[1].call, Call::Variant { start: 11 });
        // no END, one base of REF
        assert_eq!(records[2].call, Call::Block(Block::new(12, 12, 20).unwrap()));
    }

    #[test]
    fn test_filtered_records() {
        let input = format!(
            "{}{}",
            HEADER,
            "\
chr1\t5\t.\tA\t<NON_REF>\t.\tLowQual\tEND=8\tGT:GQ\t0/0:3
chr1\t9\t.\tA\t<NON_REF>\t.\t.\tEND=9\tGT:GQ\t0/0:30
"
        );
        let records = read_all(&input).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].call.start(), 9);

        let records: Vec<GvcfRecord> = GvcfReader::new(input.as_bytes())
            .unwrap()
            .keep_filtered(true)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_headerless() {
        let input = "chr1\t3\t.\tA\t<NON_REF>\t.\t.\tEND=6\tGT:GQ\t0/0:98\n";
        let reader = GvcfReader::new(input.as_bytes()).unwrap();
        assert!(reader.contigs().is_empty());
        let records: Vec<GvcfRecord> = reader.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].call, Call::Block(Block::new(3, 6, 98).unwrap()));
    }

    #[test]
    fn test_invalid_lines() {
        let cases = [
            "chr1\t3\t.\tA\t<NON_REF>\t.\t.\n",
            "chr1\tx\t.\tA\t<NON_REF>\t.\t.\tEND=6\tGT:GQ\t0/0:98\n",
            "chr1\t3\t.\tA\t<NON_REF>\t.\t.\tEND=2\tGT:GQ\t0/0:98\n",
            "chr1\t3\t.\tA\t<NON_REF>\t.\t.\tEND=6\tGT\t0/0\n",
            "chr1\t3\t.\tA\t<NON_REF>\t.\t.\tEND=6\tGT:GQ\t0/0:.\n",
            "chr1\t3\t.\tA\t<NON_REF>\t.\t.\tEND=6\tGT:GQ\t0/0:98\t0/0:97\n",
            "chr1\t3\t.\tA\t<NON_REF>\t.\t.\tEND=6\n",
        ];
        for case in cases {
            assert!(read_all(case).is_err(), "{}", case);
        }

        let err = read_all(&format!("{}{}", HEADER, cases[2])).unwrap_err();
        assert!(err.to_string().starts_with("Line 5:"), "{}", err);
    }

    #[test]
    fn test_header_errors() {
        // the meta header has to open with ##fileformat
        let input = "##contig=<ID=chr1,length=100>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        let err = GvcfReader::new(input.as_bytes()).err().unwrap();
        assert!(err.to_string().starts_with("Invalid VCF header"), "{}", err);

        // an empty file has neither header nor records
        let reader = GvcfReader::new("".as_bytes()).unwrap();
        assert!(reader.contigs().is_empty());
        assert_eq!(reader.count(), 0);
    }

    #[test]
    fn test_end_overflow() {
        let line = format!(
            "chr1\t{}\t.\tACGT\t<NON_REF>\t.\t.\t.\tGT:GQ\t0/0:30\n",
            u64::MAX - 1
        );
        let err = read_all(&line).unwrap_err();
        assert!(err.to_string().contains("coordinate range"), "{}", err);

        // a single-base REF still fits
        let line = format!("chr1\t{}\t.\tA\t<NON_REF>\t.\t.\t.\tGT:GQ\t0/0:30\n", u64::MAX);
        let records = read_all(&line).unwrap();
        assert_eq!(records[0].call.block().unwrap().end, u64::MAX);
    }
}
