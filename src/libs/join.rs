use crate::libs::gvcf::GvcfRecord;
use crate::libs::record::JointRecord;
use indexmap::IndexSet;
use std::cmp::Ordering;
use std::iter::Peekable;

/// Merges two position-sorted call streams into joint records.
///
/// Heads are ordered by contig rank, then position. Calls of both sides at
/// the same position end up in one record.
pub struct JointRecords<T, E>
where
    T: Iterator<Item = anyhow::Result<GvcfRecord>>,
    E: Iterator<Item = anyhow::Result<GvcfRecord>>,
{
    truth: Peekable<T>,
    eval: Peekable<E>,
    contigs: IndexSet<String>,
}

impl<T, E> JointRecords<T, E>
where
    T: Iterator<Item = anyhow::Result<GvcfRecord>>,
    E: Iterator<Item = anyhow::Result<GvcfRecord>>,
{
    /// `contigs` seeds the contig order, usually from the file headers.
    /// Contigs outside it are ranked by first appearance.
    pub fn new<'a, C>(truth: T, eval: E, contigs: C) -> Self
    where
        C: IntoIterator<Item = &'a String>,
    {
        Self {
            truth: truth.peekable(),
            eval: eval.peekable(),
            contigs: contigs.into_iter().cloned().collect(),
        }
    }

    pub fn contigs(&self) -> &IndexSet<String> {
        &self.contigs
    }

    fn rank(&mut self, contig: &str) -> usize {
        match self.contigs.get_index_of(contig) {
            Some(idx) => idx,
            None => self.contigs.insert_full(contig.to_string()).0,
        }
    }
}

// (contig, position) of the next record, taking errors out of the stream
fn head<I>(iter: &mut Peekable<I>) -> anyhow::Result<Option<(String, u64)>>
where
    I: Iterator<Item = anyhow::Result<GvcfRecord>>,
{
    if matches!(iter.peek(), Some(Err(_))) {
        return match iter.next() {
            Some(Err(e)) => Err(e),
            _ => unreachable!(),
        };
    }
    Ok(iter
        .peek()
        .and_then(|item| item.as_ref().ok())
        .map(|record| (record.contig.clone(), record.call.start())))
}

fn take<I>(iter: &mut Peekable<I>) -> GvcfRecord
where
    I: Iterator<Item = anyhow::Result<GvcfRecord>>,
{
    match iter.next() {
        Some(Ok(record)) => record,
        _ => unreachable!(),
    }
}

impl<T, E> Iterator for JointRecords<T, E>
where
    T: Iterator<Item = anyhow::Result<GvcfRecord>>,
    E: Iterator<Item = anyhow::Result<GvcfRecord>>,
{
    type Item = anyhow::Result<JointRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let t_head = match head(&mut self.truth) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };
        let e_head = match head(&mut self.eval) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };

        let t_key = t_head.map(|(contig, pos)| (self.rank(&contig), pos));
        let e_key = e_head.map(|(contig, pos)| (self.rank(&contig), pos));

        let ordering = match (t_key, e_key) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(t), Some(e)) => t.cmp(&e),
        };

        let record = match ordering {
            Ordering::Less => {
                let t = take(&mut self.truth);
                JointRecord::truth_only(&t.contig, t.call)
            }
            Ordering::Greater => {
                let e = take(&mut self.eval);
                JointRecord::eval_only(&e.contig, e.call)
            }
            Ordering::Equal => {
                let t = take(&mut self.truth);
                let e = take(&mut self.eval);
                JointRecord {
                    contig: t.contig,
                    position: t.call.start(),
                    truth: Some(t.call),
                    eval: Some(e.call),
                }
            }
        };

        Some(Ok(record))
    }
}
