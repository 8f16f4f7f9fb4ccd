//! Redis-protocol client over TCP.

use crate::client::StoreClient;
use crate::config::Dialect;
use crate::error::{StoreError, StoreResult};
use crate::pool::Connect;
use crate::resp::{encode_command, read_reply, Reply};
use std::io::{BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A synchronous store client speaking RESP.
///
/// The stream type is generic so the client can run over anything
/// bidirectional; [`TcpConnector`] opens the usual `TcpStream` flavour.
pub struct RespClient<S: Read + Write = TcpStream> {
    stream: BufReader<S>,
    dialect: Dialect,
}

impl<S: Read + Write> RespClient<S> {
    /// Wraps an already-connected stream.
    pub fn new(stream: S, dialect: Dialect) -> Self {
        Self {
            stream: BufReader::new(stream),
            dialect,
        }
    }

    /// Returns the command dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// Sends one command and reads its reply.
    pub fn call<A: AsRef<[u8]>>(&mut self, args: &[A]) -> StoreResult<Reply> {
        let frame = encode_command(args);
        let writer = self.stream.get_mut();
        writer.write_all(&frame)?;
        writer.flush()?;
        read_reply(&mut self.stream)
    }
}

impl RespClient<TcpStream> {
    /// Connects to `address` (`host:port`), applying `timeout` to the
    /// connect attempt and to every read and write.
    pub fn connect(address: &str, timeout: Duration, dialect: Dialect) -> StoreResult<Self> {
        let mut last_err = None;
        for addr in address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    return Ok(Self::new(stream, dialect));
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(match last_err {
            Some(err) => StoreError::unavailable(format!("cannot connect to {address}: {err}")),
            None => StoreError::unavailable(format!("{address} did not resolve to any address")),
        })
    }
}

fn command<'a>(name: &'a str, key: &'a str) -> Vec<&'a [u8]> {
    vec![name.as_bytes(), key.as_bytes()]
}

impl<S: Read + Write + Send> StoreClient for RespClient<S> {
    fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.call(&command("GET", key))?.into_optional_string()
    }

    fn multi_get(&mut self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut args: Vec<&[u8]> = vec![&b"MGET"[..]];
        args.extend(keys.iter().map(|k| k.as_bytes()));
        let values = self.call(&args)?.into_optional_strings()?;
        if values.len() != keys.len() {
            return Err(StoreError::protocol(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }
        Ok(values)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.call(&["SET", key, value])?.into_unit()
    }

    fn multi_set(&mut self, pairs: &[(String, String)]) -> StoreResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&[u8]> = vec![&b"MSET"[..]];
        for (key, value) in pairs {
            args.push(key.as_bytes());
            args.push(value.as_bytes());
        }
        self.call(&args)?.into_unit()
    }

    fn delete(&mut self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args: Vec<&[u8]> = vec![&b"DEL"[..]];
        args.extend(keys.iter().map(|k| k.as_bytes()));
        let removed = self.call(&args)?.into_integer()?;
        Ok(removed.max(0) as u64)
    }

    fn zscore(&mut self, key: &str, member: &str) -> StoreResult<Option<i64>> {
        self.call(&["ZSCORE", key, member])?.into_score()
    }

    fn zset(&mut self, key: &str, member: &str, score: i64) -> StoreResult<()> {
        let score = score.to_string();
        self.call(&["ZADD", key, score.as_str(), member])?.into_unit()
    }

    fn zincr(&mut self, key: &str, member: &str, delta: i64) -> StoreResult<i64> {
        let delta = delta.to_string();
        self.call(&["ZINCRBY", key, delta.as_str(), member])?
            .into_score()?
            .ok_or_else(|| StoreError::protocol("ZINCRBY returned no score"))
    }

    fn zclear(&mut self, key: &str) -> StoreResult<u64> {
        let name = match self.dialect {
            Dialect::Ssdb => "ZCLEAR",
            Dialect::Redis => "DEL",
        };
        let removed = self.call(&command(name, key))?.into_integer()?;
        Ok(removed.max(0) as u64)
    }

    fn zcard(&mut self, key: &str) -> StoreResult<u64> {
        let count = self.call(&command("ZCARD", key))?.into_integer()?;
        Ok(count.max(0) as u64)
    }

    fn zrange(
        &mut self,
        key: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<String>> {
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        let start = offset.to_string();
        let stop = match limit {
            Some(limit) => offset.saturating_add(limit - 1).to_string(),
            None => "-1".to_string(),
        };
        self.call(&["ZRANGE", key, start.as_str(), stop.as_str()])?
            .into_strings()
    }
}

/// Opens [`RespClient`] connections over TCP for a pool.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    timeout: Duration,
    dialect: Dialect,
}

impl TcpConnector {
    /// Creates a connector for `address` (`host:port`).
    pub fn new(address: impl Into<String>, timeout: Duration, dialect: Dialect) -> Self {
        Self {
            address: address.into(),
            timeout,
            dialect,
        }
    }

    /// Returns the target address.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connect for TcpConnector {
    fn connect(&self) -> StoreResult<Box<dyn StoreClient>> {
        let client = RespClient::connect(&self.address, self.timeout, self.dialect)?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// Canned replies in, captured requests out.
    struct Scripted {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Scripted {
        fn new(replies: &[u8]) -> Self {
            Self {
                input: Cursor::new(replies.to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn client(replies: &[u8], dialect: Dialect) -> RespClient<Scripted> {
        RespClient::new(Scripted::new(replies), dialect)
    }

    fn sent(client: RespClient<Scripted>) -> String {
        String::from_utf8(client.into_inner().output).unwrap()
    }

    #[test]
    fn get_and_missing_get() {
        let mut c = client(b"$2\r\nhi\r\n$-1\r\n", Dialect::Ssdb);
        assert_eq!(c.get("a").unwrap().as_deref(), Some("hi"));
        assert_eq!(c.get("b").unwrap(), None);
        assert_eq!(sent(c), "*2\r\n$3\r\nGET\r\n$1\r\na\r\n*2\r\n$3\r\nGET\r\n$1\r\nb\r\n");
    }

    #[test]
    fn multi_set_is_one_mset() {
        let mut c = client(b"+OK\r\n", Dialect::Ssdb);
        c.multi_set(&[("a".into(), "1".into()), ("b".into(), "2".into())])
            .unwrap();
        assert_eq!(
            sent(c),
            "*5\r\n$4\r\nMSET\r\n$1\r\na\r\n$1\r\n1\r\n$1\r\nb\r\n$1\r\n2\r\n"
        );
    }

    #[test]
    fn empty_batches_send_nothing() {
        let mut c = client(b"", Dialect::Ssdb);
        c.multi_set(&[]).unwrap();
        assert!(c.multi_get(&[]).unwrap().is_empty());
        assert_eq!(c.delete(&[]).unwrap(), 0);
        assert_eq!(c.zrange("z", 0, Some(0)).unwrap(), Vec::<String>::new());
        assert_eq!(sent(c), "");
    }

    #[test]
    fn multi_get_checks_arity() {
        let mut c = client(b"*1\r\n$1\r\nx\r\n", Dialect::Ssdb);
        let err = c.multi_get(&["a".into(), "b".into()]).unwrap_err();
        assert!(matches!(err, StoreError::Protocol { .. }));
    }

    #[test]
    fn zclear_depends_on_dialect() {
        let mut ssdb = client(b":2\r\n", Dialect::Ssdb);
        assert_eq!(ssdb.zclear("z").unwrap(), 2);
        assert!(sent(ssdb).contains("ZCLEAR"));

        let mut redis = client(b":1\r\n", Dialect::Redis);
        assert_eq!(redis.zclear("z").unwrap(), 1);
        assert!(sent(redis).contains("DEL"));
    }

    #[test]
    fn sorted_set_commands() {
        let mut c = client(
            b":1\r\n$1\r\n3\r\n$1\r\n5\r\n:2\r\n*2\r\n$1\r\na\r\n$1\r\nb\r\n",
            Dialect::Ssdb,
        );
        c.zset("z", "a", 3).unwrap();
        assert_eq!(c.zscore("z", "a").unwrap(), Some(3));
        assert_eq!(c.zincr("z", "a", 2).unwrap(), 5);
        assert_eq!(c.zcard("z").unwrap(), 2);
        assert_eq!(c.zrange("z", 0, None).unwrap(), vec!["a", "b"]);

        let out = sent(c);
        assert!(out.contains("$4\r\nZADD\r\n$1\r\nz\r\n$1\r\n3\r\n$1\r\na\r\n"));
        assert!(out.contains("$7\r\nZINCRBY\r\n$1\r\nz\r\n$1\r\n2\r\n$1\r\na\r\n"));
        assert!(out.contains("$6\r\nZRANGE\r\n$1\r\nz\r\n$1\r\n0\r\n$2\r\n-1\r\n"));
    }

    #[test]
    fn zrange_limit_maps_to_inclusive_stop() {
        let mut c = client(b"*0\r\n", Dialect::Ssdb);
        c.zrange("z", 2, Some(3)).unwrap();
        assert!(sent(c).contains("$1\r\n2\r\n$1\r\n4\r\n"));
    }

    #[test]
    fn zrange_stop_saturates() {
        let mut c = client(b"*0\r\n", Dialect::Ssdb);
        c.zrange("z", 5, Some(usize::MAX)).unwrap();
        let max = usize::MAX.to_string();
        assert!(sent(c).ends_with(&format!("${}\r\n{max}\r\n", max.len())));
    }

    #[test]
    fn server_error_surfaces() {
        let mut c = client(b"-ERR wrong type\r\n", Dialect::Ssdb);
        let err = c.set("a", "b").unwrap_err();
        assert!(matches!(err, StoreError::Server { ref message } if message == "ERR wrong type"));
    }

    #[test]
    fn closed_connection_is_io_error() {
        let mut c = client(b"", Dialect::Ssdb);
        let err = c.get("a").unwrap_err();
        assert!(err.is_connection_error());
    }
}
