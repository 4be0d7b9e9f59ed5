//! Optional LED sign output: pushes alert text to a networked sign
//! controller. Non-fatal if the sign is unreachable — a down sign must
//! never block GPIO activation or broadcast assembly.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Destination for alert text pushed to a physical sign.
pub trait LedSignSink: Send + Sync {
    /// Display `text`. Errors are logged by the caller and otherwise
    /// ignored — see module docs.
    fn display(&self, text: &str) -> std::io::Result<()>;
}

/// Sends alert text as a newline-terminated line over a plain TCP socket,
/// the lowest common denominator protocol supported by most commodity LED
/// sign controllers.
pub struct TcpLedSign {
    addr: String,
    timeout: Duration,
}

impl TcpLedSign {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl LedSignSink for TcpLedSign {
    fn display(&self, text: &str) -> std::io::Result<()> {
        let addr = self
            .addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"))?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_write_timeout(Some(self.timeout))?;
        writeln!(stream, "{text}")
    }
}

/// Discards everything. Default when no sign is configured.
pub struct NullLedSign;

impl LedSignSink for NullLedSign {
    fn display(&self, _text: &str) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sign_always_succeeds() {
        let sign = NullLedSign;
        assert!(sign.display("TORNADO WARNING").is_ok());
    }

    #[test]
    fn connecting_to_closed_port_errors_without_panicking() {
        let sign = TcpLedSign::new("127.0.0.1:1").with_timeout(Duration::from_millis(200));
        assert!(sign.display("test").is_err());
    }
}
