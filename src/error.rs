use std::io;

use httparse;
use regex;

use serializer::HeaderError;

quick_error! {
    /// Connection-level error: anything that tears the socket down.
    #[derive(Debug)]
    pub enum Error {
        Io(err: io::Error) {
            description("I/O error")
            display("I/O error: {}", err)
            from()
        }
        ParseError(err: httparse::Error) {
            description("parse error")
            display("parse error: {:?}", err)
            from()
        }
        ChunkParseError(err: httparse::InvalidChunkSize) {
            description("chunk size parse error")
            from()
        }
        BadChunkFraming {
            description("chunk data is not followed by CRLF")
        }
        BadRequestTarget {
            description("error parsing request target")
        }
        HostInvalid {
            description("invalid host header")
        }
        ContentLengthInvalid {
            description("invalid content-length header")
        }
        DuplicateContentLength {
            description("duplicate content length header")
        }
        Header(err: HeaderError) {
            description("error serializing response headers")
            display("error serializing response headers: {}", err)
            from()
        }
    }
}

quick_error! {
    /// Why a route registration was rejected.
    ///
    /// Surfaced as `route(...)` returning false; no rule is added.
    #[derive(Debug)]
    pub enum RuleError {
        UnknownParameterType {
            description("no converter registered for a handler \
                parameter type")
        }
        ArityMismatch(placeholders: usize, parameters: usize) {
            description("placeholder count does not match handler \
                parameter count")
            display("pattern has {} captures but the handler takes {}",
                placeholders, parameters)
        }
        BadMethodMask {
            description("invalid method mask")
        }
        BadPattern(err: regex::Error) {
            description("pattern does not compile")
            display("pattern does not compile: {}", err)
            from()
        }
    }
}
