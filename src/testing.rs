// Test doubles: an in-memory Drive tree, a prompter that replays canned
// answers, a reporter that remembers what it was told, and a one-shot HTTP
// server for the REST clients.

use crate::drive::{ChildPage, DriveApi, DriveItem, RemoteFile, FOLDER_MIME};
use crate::error::{Error, Result};
use crate::ui::{Prompter, Reporter};
use indicatif::ProgressBar;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;

#[derive(Default)]
pub struct MemoryDrive {
    items: Vec<DriveItem>,
    listed_under: HashMap<String, String>,
    content: HashMap<String, Vec<u8>>,
    denied: HashSet<String>,
    broken: HashSet<String>,
    page_size: usize,
    listed: RefCell<Vec<String>>,
}

impl MemoryDrive {
    pub fn new() -> Self {
        MemoryDrive {
            page_size: 100,
            ..Default::default()
        }
    }

    fn push(
        &mut self,
        id: &str,
        name: &str,
        mime: &str,
        parent: Option<&str>,
        modified: Option<&str>,
    ) {
        self.items.push(DriveItem {
            id: id.into(),
            name: name.into(),
            mime_type: mime.into(),
            created_time: modified.map(|m| m.parse().unwrap()),
            modified_time: modified.map(|m| m.parse().unwrap()),
            size: None,
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        });
        if let Some(p) = parent {
            self.listed_under.insert(id.into(), p.into());
        }
    }

    pub fn add_folder(&mut self, id: &str, name: &str, parent: Option<&str>) {
        self.push(id, name, FOLDER_MIME, parent, None);
    }

    pub fn add_file(&mut self, id: &str, name: &str, parent: &str, modified: &str) {
        self.push(id, name, "application/vnd.ms-pki.stl", Some(parent), Some(modified));
    }

    pub fn add_other(&mut self, id: &str, name: &str, parent: &str) {
        self.push(id, name, "text/plain", Some(parent), None);
    }

    /// A file that shows up in `listed_in`'s listing but has no `parents`.
    pub fn add_orphan_file(&mut self, id: &str, name: &str, listed_in: &str) {
        self.push(id, name, "application/vnd.ms-pki.stl", None, Some("2020-01-01T00:00:00Z"));
        self.listed_under.insert(id.into(), listed_in.into());
    }

    pub fn set_content(&mut self, id: &str, bytes: &[u8]) {
        self.content.insert(id.into(), bytes.to_vec());
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.size = Some(bytes.len() as u64);
        }
    }

    pub fn deny(&mut self, id: &str) {
        self.denied.insert(id.into());
    }

    pub fn break_stream(&mut self, id: &str) {
        self.broken.insert(id.into());
    }

    pub fn set_page_size(&mut self, n: usize) {
        self.page_size = n;
    }

    /// Folders whose children were requested, in order.
    pub fn listed(&self) -> Vec<String> {
        let mut seen = self.listed.borrow().clone();
        seen.dedup();
        seen
    }

    fn item(&self, id: &str) -> Result<DriveItem> {
        if self.denied.contains(id) {
            return Err(Error::NotFound(format!("{id}: permission denied")));
        }
        self.items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{id}: no such item")))
    }
}

impl DriveApi for MemoryDrive {
    fn folder(&self, folder_id: &str) -> Result<DriveItem> {
        self.item(folder_id)
    }

    fn children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        self.item(folder_id)?;
        self.listed.borrow_mut().push(folder_id.to_string());
        let all: Vec<DriveItem> = self
            .items
            .iter()
            .filter(|i| self.listed_under.get(&i.id).map(String::as_str) == Some(folder_id))
            .cloned()
            .collect();
        let start: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(all.len());
        Ok(ChildPage {
            files: all[start..end].to_vec(),
            next_page_token: (end < all.len()).then(|| end.to_string()),
        })
    }

    fn file(&self, file_id: &str) -> Result<DriveItem> {
        self.item(file_id)
    }

    fn media(&self, file_id: &str) -> Result<Box<dyn Read>> {
        self.item(file_id)?;
        if self.broken.contains(file_id) {
            return Ok(Box::new(BrokenReader { sent: false }));
        }
        let bytes = self.content.get(file_id).cloned().unwrap_or_default();
        Ok(Box::new(io::Cursor::new(bytes)))
    }
}

/// Yields one chunk, then fails like a dropped connection.
struct BrokenReader {
    sent: bool,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
        }
        self.sent = true;
        let chunk = b"solid ";
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub confirms: VecDeque<bool>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompter {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            confirms: VecDeque::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn line(&mut self, prompt: &str) -> Result<String> {
        self.answers.pop_front().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer left for `{prompt}`"),
            ))
        })
    }

    fn confirm(&mut self, _prompt: &str, default: bool) -> Result<bool> {
        Ok(self.confirms.pop_front().unwrap_or(default))
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    lines: RefCell<Vec<(&'static str, String)>>,
    spinners: RefCell<Vec<ProgressBar>>,
}

impl RecordingReporter {
    fn push(&self, level: &'static str, msg: &str) {
        self.lines.borrow_mut().push((level, msg.to_string()));
    }

    fn of(&self, level: &str) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.of("warn")
    }

    pub fn errors(&self) -> Vec<String> {
        self.of("error")
    }

    pub fn presented(&self) -> Vec<String> {
        self.of("present")
    }

    /// Every spinner handed out so far.
    pub fn spinners(&self) -> Vec<ProgressBar> {
        self.spinners.borrow().clone()
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }

    fn success(&self, msg: &str) {
        self.push("success", msg);
    }

    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }

    fn error(&self, msg: &str) {
        self.push("error", msg);
    }

    fn present(&self, file: &RemoteFile, _position: usize, _total: usize) {
        self.push("present", &file.id);
    }

    fn progress(&self) -> ProgressBar {
        ProgressBar::hidden()
    }

    fn spinner(&self, _msg: &str) -> ProgressBar {
        let bar = ProgressBar::hidden();
        self.spinners.borrow_mut().push(bar.clone());
        bar
    }
}

/// Serve the given canned responses, one per accepted connection, and hand
/// back each request: its request line, lower-cased headers and, after a
/// blank line, the body if there was one.
pub fn serve(responses: Vec<String>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            let mut body_len: usize = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let line = line.trim().to_lowercase();
                if let Some(n) = line.strip_prefix("content-length:") {
                    body_len = n.trim().parse().unwrap();
                }
                headers.push(line);
            }
            let mut body = vec![0u8; body_len];
            reader.read_exact(&mut body).unwrap();
            let mut request = format!("{}\n{}", request_line.trim(), headers.join("\n"));
            if !body.is_empty() {
                request.push_str("\n\n");
                request.push_str(&String::from_utf8_lossy(&body));
            }
            seen.push(request);
            stream.write_all(response.as_bytes()).unwrap();
        }
        seen
    });
    (base, handle)
}

pub fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
