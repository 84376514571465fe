use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{CrackError, Result};
use crate::password_generator::PasswordGenerator;

pub const DEFAULT_COMMENT_MARKER: &str = "#!comment:";

/// One password guess and its position in the generation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub password: String,
    pub index: u64,
}

impl Candidate {
    pub fn new(password: impl Into<String>, index: u64) -> Self {
        Candidate {
            password: password.into(),
            index,
        }
    }
}

/// Streams candidates from a wordlist, one per line.
///
/// The index of a candidate is its 0-based line number, so comment lines
/// use up an index without producing a candidate.
pub struct WordlistReader<R> {
    reader: R,
    comment_marker: String,
    start_line: u64,
    line: u64,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> WordlistReader<R> {
    pub fn new(reader: R, start_line: u64, comment_marker: &str) -> Self {
        WordlistReader {
            reader,
            comment_marker: comment_marker.to_string(),
            start_line,
            line: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    pub fn start_line(&self) -> u64 {
        self.start_line
    }
}

impl<R: BufRead> Iterator for WordlistReader<R> {
    type Item = std::io::Result<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    let line = self.line;
                    self.line += 1;

                    if line < self.start_line {
                        continue;
                    }

                    let mut end = self.buf.len();
                    if self.buf[..end].ends_with(b"\n") {
                        end -= 1;
                    }
                    if self.buf[..end].ends_with(b"\r") {
                        end -= 1;
                    }
                    let word = String::from_utf8_lossy(&self.buf[..end]);

                    if !self.comment_marker.is_empty() && word.starts_with(&self.comment_marker) {
                        continue;
                    }

                    return Some(Ok(Candidate::new(word.into_owned(), line)));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Where candidates come from for one run
pub enum CandidateSource {
    Combinatorial(PasswordGenerator),
    Wordlist(WordlistReader<Box<dyn BufRead + Send>>),
}

impl CandidateSource {
    pub fn combinatorial(charset: &str, max_length: usize) -> Self {
        CandidateSource::Combinatorial(PasswordGenerator::new(charset, max_length))
    }

    pub fn wordlist(path: &Path, start_line: u64, comment_marker: &str) -> Result<Self> {
        let file = File::open(path).map_err(|source| CrackError::Wordlist {
            path: path.to_path_buf(),
            source,
        })?;
        let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(file));
        Ok(CandidateSource::Wordlist(WordlistReader::new(
            reader,
            start_line,
            comment_marker,
        )))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static, start_line: u64, comment_marker: &str) -> Self {
        let reader: Box<dyn BufRead + Send> = Box::new(reader);
        CandidateSource::Wordlist(WordlistReader::new(reader, start_line, comment_marker))
    }

    /// Only wordlist progress has a persisted meaning across restarts
    pub fn resumable(&self) -> bool {
        matches!(self, CandidateSource::Wordlist(_))
    }

    pub fn start_index(&self) -> u64 {
        match self {
            CandidateSource::Combinatorial(_) => 0,
            CandidateSource::Wordlist(reader) => reader.start_line(),
        }
    }
}

impl Iterator for CandidateSource {
    type Item = std::io::Result<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            CandidateSource::Combinatorial(gen) => gen.next().map(Ok),
            CandidateSource::Wordlist(reader) => reader.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(text: &str, start: u64) -> Vec<Candidate> {
        WordlistReader::new(Cursor::new(text.as_bytes().to_vec()), start, DEFAULT_COMMENT_MARKER)
            .map(|c| c.unwrap())
            .collect()
    }

    #[test]
    fn test_reads_lines_in_order() {
        let got = read_all("alpha\nbeta\r\ngamma", 0);
        assert_eq!(
            got,
            vec![
                Candidate::new("alpha", 0),
                Candidate::new("beta", 1),
                Candidate::new("gamma", 2),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped_but_keep_their_line() {
        let got = read_all("one\n#!comment: header\ntwo\n", 0);
        assert_eq!(got, vec![Candidate::new("one", 0), Candidate::new("two", 2)]);
    }

    #[test]
    fn test_start_line_skips_earlier_lines() {
        let text = "l0\nl1\nl2\nl3\nl4\nl5\nl6\n";
        let got = read_all(text, 5);
        assert_eq!(got, vec![Candidate::new("l5", 5), Candidate::new("l6", 6)]);

        assert_eq!(read_all(text, 7).len(), 0);
        assert_eq!(read_all(text, 100).len(), 0);
    }

    #[test]
    fn test_empty_lines_are_candidates() {
        let got = read_all("\n\nx\n", 0);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].password, "");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let bytes = vec![b'a', 0xff, b'b', b'\n'];
        let got: Vec<Candidate> = WordlistReader::new(Cursor::new(bytes), 0, DEFAULT_COMMENT_MARKER)
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(got.len(), 1);
        assert!(got[0].password.starts_with('a'));
        assert!(got[0].password.ends_with('b'));
    }

    #[test]
    fn test_source_resumable_flag() {
        let combo = CandidateSource::combinatorial("ab", 1);
        assert!(!combo.resumable());
        assert_eq!(combo.start_index(), 0);

        let words = CandidateSource::from_reader(Cursor::new(b"a\nb\n".to_vec()), 1, DEFAULT_COMMENT_MARKER);
        assert!(words.resumable());
        assert_eq!(words.start_index(), 1);
        let got: Vec<String> = words.map(|c| c.unwrap().password).collect();
        assert_eq!(got, vec!["b"]);
    }

    #[test]
    fn test_missing_wordlist_is_an_error() {
        let err = CandidateSource::wordlist(Path::new("/nonexistent/words.txt"), 0, DEFAULT_COMMENT_MARKER);
        assert!(matches!(err, Err(CrackError::Wordlist { .. })));
    }
}
