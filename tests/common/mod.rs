//! Builders for in-memory test fixtures.

#![allow(dead_code)]

/// Assembles a PDF file piece by piece, tracking byte offsets.
pub struct PdfBuilder {
    data: Vec<u8>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            data: b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec(),
        }
    }

    pub fn without_header() -> Self {
        Self { data: Vec::new() }
    }

    pub fn offset(&self) -> u64 {
        self.data.len() as u64
    }

    /// Append raw bytes and return where they start.
    pub fn raw(&mut self, bytes: &[u8]) -> u64 {
        let at = self.offset();
        self.data.extend_from_slice(bytes);
        at
    }

    /// Append `N 0 obj body endobj` and return its offset.
    pub fn object(&mut self, number: u32, body: &str) -> u64 {
        self.raw(format!("{} 0 obj\n{}\nendobj\n", number, body).as_bytes())
    }

    /// Append a stream object with an exact `/Length`.
    pub fn stream_object(&mut self, number: u32, dict_entries: &str, content: &[u8]) -> u64 {
        let at = self.raw(
            format!("{} 0 obj\n<< {} /Length {} >>\nstream\n", number, dict_entries, content.len()).as_bytes(),
        );
        self.raw(content);
        self.raw(b"\nendstream\nendobj\n");
        at
    }

    /// Append a classic table with one subsection per entry.
    ///
    /// Entries are `(object number, offset or next free, generation, in use)`.
    pub fn classic_xref(&mut self, entries: &[(u32, u64, u16, bool)], trailer: &str) -> u64 {
        let at = self.raw(b"xref\n");
        for &(number, offset, generation, in_use) in entries {
            let kind = if in_use { 'n' } else { 'f' };
            self.raw(format!("{} 1\n{:010} {:05} {} \n", number, offset, generation, kind).as_bytes());
        }
        self.raw(format!("trailer\n{}\n", trailer).as_bytes());
        at
    }

    /// Append an uncompressed cross-reference stream with `/W [1 4 2]`.
    ///
    /// Rows are `(object number, type, field 2, field 3)`.
    pub fn xref_stream(&mut self, number: u32, rows: &[(u32, u8, u32, u16)], extra: &str) -> u64 {
        let mut content = Vec::new();
        let mut index = String::new();
        for &(object, kind, field2, field3) in rows {
            content.push(kind);
            content.extend_from_slice(&field2.to_be_bytes());
            content.extend_from_slice(&field3.to_be_bytes());
            index.push_str(&format!("{} 1 ", object));
        }
        let size = rows.iter().map(|r| r.0).max().unwrap_or(0).max(number) + 1;
        let dict = format!("/Type /XRef /W [1 4 2] /Index [{}] /Size {} {}", index.trim_end(), size, extra);
        self.stream_object(number, &dict, &content)
    }

    /// Append `startxref` and `%%EOF`.
    pub fn finish(mut self, startxref: u64) -> Vec<u8> {
        self.raw(format!("startxref\n{}\n%%EOF\n", startxref).as_bytes());
        self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

pub mod font;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
