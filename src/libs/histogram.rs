use anyhow::{anyhow, bail};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// A composite histogram key of two integer fields.
///
/// The order of the key drives the row order of the written table.
pub trait BinKey: Ord + Copy {
    /// Header columns naming the two fields
    const COLUMNS: [&'static str; 2];

    fn fields(&self) -> [u64; 2];

    fn from_fields(fields: [u64; 2]) -> anyhow::Result<Self>;
}

/// Length and confidence of a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockKey {
    pub length: u64,
    pub confidence: u32,
}

impl BlockKey {
    pub fn new(length: u64, confidence: u32) -> Self {
        Self { length, confidence }
    }
}

impl BinKey for BlockKey {
    const COLUMNS: [&'static str; 2] = ["length", "confidence"];

    fn fields(&self) -> [u64; 2] {
        [self.length, self.confidence as u64]
    }

    fn from_fields(fields: [u64; 2]) -> anyhow::Result<Self> {
        let confidence = u32::try_from(fields[1])
            .map_err(|_| anyhow!("Confidence {} out of range", fields[1]))?;
        Ok(Self::new(fields[0], confidence))
    }
}

/// Confidences of an overlapping truth and eval block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfidencePair {
    pub truth: u32,
    pub eval: u32,
}

impl ConfidencePair {
    pub fn new(truth: u32, eval: u32) -> Self {
        Self { truth, eval }
    }
}

impl BinKey for ConfidencePair {
    const COLUMNS: [&'static str; 2] = ["truth_confidence", "eval_confidence"];

    fn fields(&self) -> [u64; 2] {
        [self.truth as u64, self.eval as u64]
    }

    fn from_fields(fields: [u64; 2]) -> anyhow::Result<Self> {
        let truth = u32::try_from(fields[0])
            .map_err(|_| anyhow!("Confidence {} out of range", fields[0]))?;
        let eval = u32::try_from(fields[1])
            .map_err(|_| anyhow!("Confidence {} out of range", fields[1]))?;
        Ok(Self::new(truth, eval))
    }
}

/// Counts per key, kept in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram<K: Ord> {
    bins: BTreeMap<K, u64>,
}

impl<K: Ord> Default for Histogram<K> {
    fn default() -> Self {
        Self {
            bins: BTreeMap::new(),
        }
    }
}

impl<K: BinKey> Histogram<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: K, amount: u64) {
        *self.bins.entry(key).or_insert(0) += amount;
    }

    pub fn get(&self, key: &K) -> u64 {
        self.bins.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.bins.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &u64)> {
        self.bins.iter()
    }

    /// Point-wise addition.
    ///
    /// ```
    /// use blockcon::libs::histogram::{BlockKey, Histogram};
    /// let mut a = Histogram::new();
    /// a.increment(BlockKey::new(10, 99), 1);
    /// let mut b = Histogram::new();
    /// b.increment(BlockKey::new(10, 99), 2);
    /// b.increment(BlockKey::new(5, 98), 1);
    /// a.merge(&b);
    /// assert_eq!(a.get(&BlockKey::new(10, 99)), 3);
    /// assert_eq!(a.total(), 4);
    /// ```
    pub fn merge(&mut self, other: &Histogram<K>) {
        for (key, count) in other.iter() {
            self.increment(*key, *count);
        }
    }

    pub fn header() -> String {
        format!("{}\t{}\tcount", K::COLUMNS[0], K::COLUMNS[1])
    }

    /// Writes a header line and one row per bin.
    pub fn write_tsv<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", Self::header())?;
        for (key, count) in self.iter() {
            let [a, b] = key.fields();
            writeln!(writer, "{}\t{}\t{}", a, b, count)?;
        }
        Ok(())
    }

    /// Reads a table written by [`Histogram::write_tsv`].
    ///
    /// Repeated keys are summed.
    pub fn read_tsv<R: BufRead + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut histogram = Self::new();
        let mut seen_header = false;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            if !seen_header {
                if line != Self::header() {
                    bail!(
                        "Unexpected histogram header at line {}: expected [{}], found [{}]",
                        idx + 1,
                        Self::header().replace('\t', " "),
                        line.replace('\t', " ")
                    );
                }
                seen_header = true;
                continue;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() != 3 {
                bail!("Line {}: expected 3 columns, found {}", idx + 1, parts.len());
            }
            let mut values = [0u64; 3];
            for (value, part) in values.iter_mut().zip(parts.iter()) {
                *value = part
                    .parse()
                    .map_err(|_| anyhow!("Line {}: invalid number {}", idx + 1, part))?;
            }

            let key = K::from_fields([values[0], values[1]])?;
            histogram.increment(key, values[2]);
        }

        if !seen_header {
            bail!("Empty histogram table");
        }

        Ok(histogram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_and_order() {
        let mut h = Histogram::new();
        h.increment(ConfidencePair::new(99, 98), 5);
        h.increment(ConfidencePair::new(40, 99), 2);
        h.increment(ConfidencePair::new(99, 98), 5);

        assert_eq!(h.len(), 2);
        assert_eq!(h.total(), 12);
        assert_eq!(h.get(&ConfidencePair::new(99, 98)), 10);
        assert_eq!(h.get(&ConfidencePair::new(1, 1)), 0);

        let keys: Vec<_> = h.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![ConfidencePair::new(40, 99), ConfidencePair::new(99, 98)]
        );
    }

    #[test]
    fn test_write_tsv() {
        let mut h = Histogram::new();
        h.increment(BlockKey::new(10, 99), 1);
        h.increment(BlockKey::new(5, 98), 3);

        let mut out: Vec<u8> = vec![];
        h.write_tsv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "length\tconfidence\tcount\n5\t98\t3\n10\t99\t1\n"
        );

        let empty: Histogram<ConfidencePair> = Histogram::new();
        let mut out: Vec<u8> = vec![];
        empty.write_tsv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "truth_confidence\teval_confidence\tcount\n"
        );
    }

    #[test]
    fn test_read_tsv() {
        let input = "length\tconfidence\tcount\n5\t98\t3\n\n5\t98\t1\n10\t99\t1\n";
        let h: Histogram<BlockKey> = Histogram::read_tsv(&mut input.as_bytes()).unwrap();
        assert_eq!(h.get(&BlockKey::new(5, 98)), 4);
        assert_eq!(h.get(&BlockKey::new(10, 99)), 1);

        // a block table is not a confidence table
        let res: anyhow::Result<Histogram<ConfidencePair>> =
            Histogram::read_tsv(&mut input.as_bytes());
        assert!(res.is_err());

        let bad = "length\tconfidence\tcount\n5\tx\t3\n";
        let res: anyhow::Result<Histogram<BlockKey>> = Histogram::read_tsv(&mut bad.as_bytes());
        assert!(res.is_err());

        let res: anyhow::Result<Histogram<BlockKey>> = Histogram::read_tsv(&mut "".as_bytes());
        assert!(res.is_err());
    }
}
