use std::{
    fmt,
    io::{self, Read},
};

use bytes::{Buf, Bytes};

/// HTTP message body.
///
/// `Stream` bodies are read lazily; the reader is dropped, and its resources
/// released, once the body is consumed or discarded.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Full(Bytes),
    Stream(Box<dyn Read + Send + Sync>),
}

impl Body {
    pub fn from_stream<R>(reader: R) -> Self
    where
        R: Read + Send + Sync + 'static,
    {
        Body::Stream(Box::new(reader))
    }

    /// Returns true only when the body is known to carry no bytes without
    /// reading it.
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Full(bytes) => bytes.is_empty(),
            Body::Stream(_) => false,
        }
    }

    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    pub fn into_reader(self) -> Box<dyn Read + Send + Sync> {
        match self {
            Body::Empty => Box::new(io::empty()),
            Body::Full(bytes) => Box::new(bytes.reader()),
            Body::Stream(reader) => reader,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full(bytes) => f.debug_tuple("Body::Full").field(bytes).finish(),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Full(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Full(Bytes::from_static(s.as_bytes()))
    }
}
