//! Line-oriented JSON client used to drive a running listener.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::Value;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct JsonLineClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl JsonLineClient {
    pub fn connect(addr: SocketAddr) -> Self {
        let writer = TcpStream::connect(addr).expect("connect client");
        writer
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("set read timeout");
        let reader = BufReader::new(writer.try_clone().expect("clone client"));
        Self { writer, reader }
    }

    /// Writes raw bytes without adding a delimiter.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("write request");
        self.writer.flush().expect("flush request");
    }

    pub fn send_line(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes());
    }

    /// Reads one raw response line; empty once the server has closed.
    pub fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response");
        line
    }

    pub fn read_response(&mut self) -> Value {
        let line = self.read_line();
        assert!(!line.is_empty(), "connection closed before a response");
        serde_json::from_str(&line).expect("response should be JSON")
    }

    pub fn request(&mut self, line: &str) -> Value {
        self.send_line(line);
        self.read_response()
    }
}
