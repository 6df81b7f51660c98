use std::fmt;

/// Protocol version on a status line.
///
/// Requests parse as either variant; responses are always emitted as
/// `Http11`, so this mostly feeds the status-line writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enum with the HTTP status codes a handler may answer with.
///
/// Covers RFC 2616 section 10 plus the WebDAV and registration
/// extensions. Unlisted codes can be sent with `Status::Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    // custom http code
    Raw(u16, String),
    //  1xx status codes
    Continue,                       // 100
    SwitchingProtocols,             // 101
    Processing,                     // 102
    //  2xx status codes
    Ok,                             // 200
    Created,                        // 201
    Accepted,                       // 202
    NonAuthoritativeInformation,    // 203
    NoContent,                      // 204
    ResetContent,                   // 205
    PartialContent,                 // 206
    MultiStatus,                    // 207
    AlreadyReported,                // 208
    IMUsed,                         // 226
    //  3xx status codes
    MultipleChoices,                // 300
    MovedPermanently,               // 301
    Found,                          // 302
    SeeOther,                       // 303
    NotModified,                    // 304
    UseProxy,                       // 305
    TemporaryRedirect,              // 307
    PermanentRedirect,              // 308
    //  4xx status codes
    BadRequest,                     // 400
    Unauthorized,                   // 401
    PaymentRequired,                // 402
    Forbidden,                      // 403
    NotFound,                       // 404
    MethodNotAllowed,               // 405
    NotAcceptable,                  // 406
    ProxyAuthenticationRequired,    // 407
    RequestTimeout,                 // 408
    Conflict,                       // 409
    Gone,                           // 410
    LengthRequired,                 // 411
    PreconditionFailed,             // 412
    PayloadTooLarge,                // 413
    UriTooLong,                     // 414
    UnsupportedMediaType,           // 415
    RequestRangeNotSatisfiable,     // 416
    ExpectationFailed,              // 417
    ImATeapot,                      // 418
    MisdirectedRequest,             // 421
    UnprocessableEntity,            // 422
    Locked,                         // 423
    FailedDependency,               // 424
    UpgradeRequired,                // 426
    PreconditionRequired,           // 428
    TooManyRequests,                // 429
    RequestHeaderFieldsTooLarge,    // 431
    UnavailableForLegalReasons,     // 451
    //  5xx status codes
    InternalServerError,            // 500
    NotImplemented,                 // 501
    BadGateway,                     // 502
    ServiceUnavailable,             // 503
    GatewayTimeout,                 // 504
    HttpVersionNotSupported,        // 505
    VariantAlsoNegotiates,          // 506
    InsufficientStorage,            // 507
    LoopDetected,                   // 508
    NotExtended,                    // 510
    NetworkAuthenticationRequired,  // 511
    NetworkConnectTimeoutError,     // 599
}

impl Status {
    pub fn code(&self) -> u16 {
        use self::Status::*;
        match *self {
            //  1xx status codes
            Continue                        => 100,
            SwitchingProtocols              => 101,
            Processing                      => 102,
            //  2xx status codes
            Ok                              => 200,
            Created                         => 201,
            Accepted                        => 202,
            NonAuthoritativeInformation     => 203,
            NoContent                       => 204,
            ResetContent                    => 205,
            PartialContent                  => 206,
            MultiStatus                     => 207,
            AlreadyReported                 => 208,
            IMUsed                          => 226,
            //  3xx status codes
            MultipleChoices                 => 300,
            MovedPermanently                => 301,
            Found                           => 302,
            SeeOther                        => 303,
            NotModified                     => 304,
            UseProxy                        => 305,
            TemporaryRedirect               => 307,
            PermanentRedirect               => 308,
            //  4xx status codes
            BadRequest                      => 400,
            Unauthorized                    => 401,
            PaymentRequired                 => 402,
            Forbidden                       => 403,
            NotFound                        => 404,
            MethodNotAllowed                => 405,
            NotAcceptable                   => 406,
            ProxyAuthenticationRequired     => 407,
            RequestTimeout                  => 408,
            Conflict                        => 409,
            Gone                            => 410,
            LengthRequired                  => 411,
            PreconditionFailed              => 412,
            PayloadTooLarge                 => 413,
            UriTooLong                      => 414,
            UnsupportedMediaType            => 415,
            RequestRangeNotSatisfiable      => 416,
            ExpectationFailed               => 417,
            ImATeapot                       => 418,
            MisdirectedRequest              => 421,
            UnprocessableEntity             => 422,
            Locked                          => 423,
            FailedDependency                => 424,
            UpgradeRequired                 => 426,
            PreconditionRequired            => 428,
            TooManyRequests                 => 429,
            RequestHeaderFieldsTooLarge     => 431,
            UnavailableForLegalReasons      => 451,
            //  5xx status codes
            InternalServerError             => 500,
            NotImplemented                  => 501,
            BadGateway                      => 502,
            ServiceUnavailable              => 503,
            GatewayTimeout                  => 504,
            HttpVersionNotSupported         => 505,
            VariantAlsoNegotiates           => 506,
            InsufficientStorage             => 507,
            LoopDetected                    => 508,
            NotExtended                     => 510,
            NetworkAuthenticationRequired   => 511,
            NetworkConnectTimeoutError      => 599,
            Raw(code, _) => code,
        }
    }

    pub fn reason(&self) -> &str {
        use self::Status::*;
        match *self {
            //  1xx status codes
            Continue                        => "Continue",
            SwitchingProtocols              => "Switching Protocols",
            Processing                      => "Processing",
            //  2xx status codes
            Ok                              => "OK",
            Created                         => "Created",
            Accepted                        => "Accepted",
            NonAuthoritativeInformation     => "Non-Authoritative Information",
            NoContent                       => "No Content",
            ResetContent                    => "Reset Content",
            PartialContent                  => "Partial Content",
            MultiStatus                     => "Multi Status",
            AlreadyReported                 => "Already Reported",
            IMUsed                          => "IM Used",
            //  3xx status codes
            MultipleChoices                 => "Multiple Choices",
            MovedPermanently                => "Moved Permanently",
            Found                           => "Found",
            SeeOther                        => "See Other",
            NotModified                     => "Not Modified",
            UseProxy                        => "Use Proxy",
            TemporaryRedirect               => "Temporary Redirect",
            PermanentRedirect               => "Permanent Redirect",
            //  4xx status codes
            BadRequest                      => "Bad Request",
            Unauthorized                    => "Unauthorized",
            PaymentRequired                 => "Payment Required",
            Forbidden                       => "Forbidden",
            NotFound                        => "Not Found",
            MethodNotAllowed                => "Method Not Allowed",
            NotAcceptable                   => "Not Acceptable",
            ProxyAuthenticationRequired     => "Proxy Authentication Required",
            RequestTimeout                  => "Request Time-out",
            Conflict                        => "Conflict",
            Gone                            => "Gone",
            LengthRequired                  => "Length Required",
            PreconditionFailed              => "Precondition Failed",
            PayloadTooLarge                 => "Payload Too Large",
            UriTooLong                      => "URI Too Long",
            UnsupportedMediaType            => "Unsupported Media Type",
            RequestRangeNotSatisfiable      => "Request Range Not Satisfiable",
            ExpectationFailed               => "Expectation Failed",
            ImATeapot                       => "I'm A Teapot",
            MisdirectedRequest              => "Misdirected Request",
            UnprocessableEntity             => "Unprocessable Entity",
            Locked                          => "Locked",
            FailedDependency                => "Failed Dependency",
            UpgradeRequired                 => "Upgrade Required",
            PreconditionRequired            => "Precondition Required",
            TooManyRequests                 => "Too Many Requests",
            RequestHeaderFieldsTooLarge     => "Request Header Fields Too Large",
            UnavailableForLegalReasons      => "Unavailable For Legal Reasons",
            //  5xx status codes
            InternalServerError             => "Internal Server Error",
            NotImplemented                  => "Not Implemented",
            BadGateway                      => "Bad Gateway",
            ServiceUnavailable              => "Service Unavailable",
            GatewayTimeout                  => "Gateway Time-out",
            HttpVersionNotSupported         => "HTTP Version not supported",
            VariantAlsoNegotiates           => "Variant Also Negotiates",
            InsufficientStorage             => "Insufficient Storage",
            LoopDetected                    => "Loop Detected",
            NotExtended                     => "Not Extended",
            NetworkAuthenticationRequired   => "Network Authentication Required",
            NetworkConnectTimeoutError      => "Network Connect Timeout Error",
            Raw(_, ref reason) => reason,
        }
    }

    /// Returns false for codes that must not carry an entity body
    /// (1xx, 204, 304).
    pub fn permits_body(&self) -> bool {
        let code = self.code();
        !((code >= 100 && code < 200) || code == 204 || code == 304)
    }
}
