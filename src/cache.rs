use crate::record::VisitRecord;

/// In-memory mirror of every stored visit. Callers persist first and only
/// then mirror the change here.
#[derive(Debug, Clone, Default)]
pub struct RecordCache {
    records: Vec<VisitRecord>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, records: Vec<VisitRecord>) {
        self.records = records;
    }

    pub fn upsert(&mut self, record: VisitRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.records.retain(|r| r.id != id);
    }

    pub fn get(&self, id: &str) -> Option<&VisitRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Newest first, filtered by a case-insensitive match on name and location.
    pub fn query(&self, term: &str) -> Vec<VisitRecord> {
        let needle = normalize_term(term);
        let mut matched: Vec<VisitRecord> = self
            .records
            .iter()
            .filter(|record| match needle.as_deref() {
                Some(needle) => record.search_haystack().contains(needle),
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matched
    }
}

fn normalize_term(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
