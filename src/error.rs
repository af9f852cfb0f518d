#[derive(Debug)]
pub enum Error {
    Encoding(std::io::Error),
    Decoding(binprot::Error),
    MethodNameTooLong(usize),
    MethodNameNotUtf8(std::string::FromUtf8Error),
    UnknownMessageKind(u8),
    BadStopMarker(u8),
    Http(Box<ureq::Error>),
    HttpStatus(ureq::http::StatusCode),
    Application(String),
    NoPendingResponse,
    ConnectionClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        Error::Http(Box::new(e))
    }
}
