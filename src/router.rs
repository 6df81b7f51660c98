use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;

use regex::{self, Captures, Regex};
use url::percent_encoding::percent_decode;

use captures::{PathArgs, PathCapture, Rest};
use enums::{MethodMask, Status};
use error::RuleError;
use handler::View;
use request::Request;
use responder::{Responder, ResponderDone};
use response::Response;

/// A route rule: path pattern, method mask and an optional extra guard.
///
/// The pattern is literal text with `<arg>` placeholders; a pattern
/// ending in `/` grows an implicit trailing placeholder consuming the
/// next path segment. Guards let a rule require more than the path and
/// method, e.g. the presence of a query key.
pub struct RouteRule {
    pattern: String,
    methods: MethodMask,
    guard: Option<Box<Fn(&Request) -> bool>>,
}

impl RouteRule {
    pub fn new<P: Into<String>>(pattern: P, methods: MethodMask)
        -> RouteRule
    {
        RouteRule {
            pattern: pattern.into(),
            methods: methods,
            guard: None,
        }
    }

    pub fn with_guard<P, F>(pattern: P, methods: MethodMask, guard: F)
        -> RouteRule
        where P: Into<String>, F: Fn(&Request) -> bool + 'static
    {
        RouteRule {
            pattern: pattern.into(),
            methods: methods,
            guard: Some(Box::new(guard)),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn methods(&self) -> MethodMask {
        self.methods
    }

    fn matches(&self, request: &Request) -> bool {
        self.methods.contains(request.method()) &&
            self.guard.as_ref().map_or(true, |g| g(request))
    }
}

struct CompiledRule<S> {
    rule: RouteRule,
    regex: Regex,
    callback: Box<Fn(&Captures, &Request, Responder<S>) -> ResponderDone<S>>,
}

/// An ordered set of route rules plus the converter map from parameter
/// types to the regex fragments capturing them.
///
/// Dispatch walks rules in insertion order; the first rule whose method
/// mask, guard and compiled pattern all accept the request wins.
pub struct Router<S> {
    rules: Vec<CompiledRule<S>>,
    converters: HashMap<TypeId, String>,
}

fn default_converters() -> HashMap<TypeId, String> {
    let mut map = HashMap::new();
    {
        let mut put = |id: TypeId, fragment: &str| {
            map.insert(id, fragment.to_string());
        };
        put(TypeId::of::<i16>(), i16::fragment());
        put(TypeId::of::<i32>(), i32::fragment());
        put(TypeId::of::<i64>(), i64::fragment());
        put(TypeId::of::<u16>(), u16::fragment());
        put(TypeId::of::<u32>(), u32::fragment());
        put(TypeId::of::<u64>(), u64::fragment());
        put(TypeId::of::<f32>(), f32::fragment());
        put(TypeId::of::<f64>(), f64::fragment());
        put(TypeId::of::<String>(), String::fragment());
        put(TypeId::of::<Rest>(), Rest::fragment());
    }
    map
}

impl<S: 'static> Router<S> {
    pub fn new() -> Router<S> {
        Router {
            rules: Vec::new(),
            converters: default_converters(),
        }
    }

    /// Registers the regex fragment capturing `T` in path patterns.
    ///
    /// Converters may only change while no rules are registered yet; a
    /// later call is ignored with a warning.
    pub fn add_converter<T: PathCapture>(&mut self, fragment: &str) {
        if !self.rules.is_empty() {
            warn!("converters can only change before the first rule is \
                added; ignoring");
            return;
        }
        self.converters.insert(TypeId::of::<T>(), fragment.to_string());
    }

    pub fn remove_converter<T: PathCapture>(&mut self) {
        if !self.rules.is_empty() {
            warn!("converters can only change before the first rule is \
                added; ignoring");
            return;
        }
        self.converters.remove(&TypeId::of::<T>());
    }

    pub fn clear_converters(&mut self) {
        if !self.rules.is_empty() {
            warn!("converters can only change before the first rule is \
                added; ignoring");
            return;
        }
        self.converters.clear();
    }

    pub fn converters(&self) -> &HashMap<TypeId, String> {
        &self.converters
    }

    pub fn rules(&self) -> usize {
        self.rules.len()
    }

    /// Compiles the rule's pattern against the view's parameter types
    /// and appends it. On any rejection no state changes.
    pub fn add_rule<K, V>(&mut self, rule: RouteRule, view: V)
        -> Result<(), RuleError>
        where V: View<S, K>
    {
        let ids = <V::Args as PathArgs>::type_ids();
        let regex = self.compile(&rule.pattern, &ids)?;
        debug_assert_eq!(regex.captures_len(), ids.len() + 1);
        let callback = Box::new(move |caps: &Captures, req: &Request,
                                      resp: Responder<S>| {
            match <V::Args as PathArgs>::from_captures(caps) {
                Some(args) => view.call(args, req, resp),
                None => {
                    // the fragment matched but the value does not fit
                    // the declared type (numeric overflow)
                    debug!("capture out of range for {}", req.url().path());
                    resp.respond(Response::from(Status::NotFound))
                }
            }
        });
        self.rules.push(CompiledRule {
            rule: rule,
            regex: regex,
            callback: callback,
        });
        Ok(())
    }

    /// Dispatches to the first matching rule.
    ///
    /// Returns the responder back when nothing matched so the caller
    /// can apply its missing-handler policy.
    pub fn handle_request(&self, request: &Request, responder: Responder<S>)
        -> Result<ResponderDone<S>, Responder<S>>
    {
        let path = decoded_path(request);
        for entry in &self.rules {
            if !entry.rule.matches(request) {
                continue;
            }
            if let Some(caps) = entry.regex.captures(&path) {
                return Ok((entry.callback)(&caps, request, responder));
            }
        }
        Err(responder)
    }

    fn compile(&self, pattern: &str, ids: &[TypeId])
        -> Result<Regex, RuleError>
    {
        let parts: Vec<&str> = pattern.split("<arg>").collect();
        let explicit = parts.len() - 1;
        // a trailing slash only grows an implicit capture when there is
        // one more parameter than explicit placeholders; `/` with a
        // zero-argument handler stays a literal match
        let implicit = if pattern.ends_with('/')
            && ids.len() == explicit + 1 { 1 } else { 0 };
        if explicit + implicit != ids.len() {
            return Err(RuleError::ArityMismatch(explicit + implicit,
                                                ids.len()));
        }
        let mut compiled = String::from("^");
        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                compiled.push('(');
                compiled.push_str(self.fragment(ids[index - 1])?);
                compiled.push(')');
            }
            compiled.push_str(&regex::escape(part));
        }
        if implicit == 1 {
            compiled.push('(');
            compiled.push_str(self.fragment(ids[ids.len() - 1])?);
            compiled.push(')');
        }
        compiled.push('$');
        Ok(Regex::new(&compiled)?)
    }

    fn fragment(&self, id: TypeId) -> Result<&str, RuleError> {
        self.converters.get(&id)
            .map(|f| f.as_str())
            .ok_or(RuleError::UnknownParameterType)
    }
}

/// The request path with percent-encoding resolved, so that `%20` and a
/// literal space match the same patterns.
fn decoded_path(request: &Request) -> Cow<str> {
    percent_decode(request.url().path().as_bytes()).decode_utf8_lossy()
}

#[cfg(test)]
mod test {
    use futures::{Future, Async};
    use tk_bufstream::{IoBuf, MockData};

    use captures::{PathCapture, Rest};
    use enums::{Method, MethodMask};
    use error::RuleError;
    use parser::Parser;
    use request::Request;
    use responder::Responder;
    use super::{Router, RouteRule};

    fn request(line: &str) -> Request {
        let mut req = Request::new(false);
        let mut parser = Parser::new();
        let raw = format!("{} HTTP/1.1\r\nHost: localhost\r\n\r\n", line);
        parser.advance(&mut req, raw.as_bytes()).unwrap();
        req
    }

    fn dispatch(router: &Router<MockData>, line: &str) -> Option<String> {
        let mock = MockData::new();
        let req = request(line);
        let resp = Responder::new(IoBuf::new(mock.clone()).split().0,
                                  req.method() == Method::Head);
        match router.handle_request(&req, resp) {
            Ok(mut done) => {
                let mut io = match done.poll().unwrap() {
                    Async::Ready(io) => io,
                    Async::NotReady => panic!("response did not finish"),
                };
                io.flush().unwrap();
                Some(String::from_utf8_lossy(&mock.output(..)).to_string())
            }
            Err(_) => None,
        }
    }

    fn body(output: &str) -> &str {
        let pos = output.find("\r\n\r\n").unwrap();
        &output[pos + 4..]
    }

    #[test]
    fn literal_and_method_mask() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/", Method::Get.into()),
            || "Hello world get").unwrap();
        router.add_rule(
            RouteRule::new("/", Method::Post.into()),
            || "Hello world post").unwrap();
        assert_eq!(body(&dispatch(&router, "GET /").unwrap()),
                   "Hello world get");
        assert_eq!(body(&dispatch(&router, "POST /").unwrap()),
                   "Hello world post");
        assert!(dispatch(&router, "PUT /").is_none());
        assert!(dispatch(&router, "GET /other").is_none());
    }

    #[test]
    fn trailing_slash_without_parameters_is_literal() {
        let mut router = Router::new();
        router.add_rule(RouteRule::new("/dir/", MethodMask::ALL),
                        || "listing").unwrap();
        assert_eq!(body(&dispatch(&router, "GET /dir/").unwrap()),
                   "listing");
        assert!(dispatch(&router, "GET /dir/file").is_none());
    }

    #[test]
    fn implicit_trailing_capture() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/page/", MethodMask::ALL),
            |page: i32| format!("page: {}", page)).unwrap();
        assert_eq!(body(&dispatch(&router, "GET /page/-10").unwrap()),
                   "page: -10");
        assert_eq!(body(&dispatch(&router, "GET /page/25").unwrap()),
                   "page: 25");
        // a second segment is not consumed by the implicit capture
        assert!(dispatch(&router, "GET /page/10/detail").is_none());
        assert!(dispatch(&router, "GET /page/abc").is_none());
    }

    #[test]
    fn unsigned_rejects_negative() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/page/<arg>/detail", MethodMask::ALL),
            |page: u32| format!("detail: {}", page)).unwrap();
        assert_eq!(body(&dispatch(&router, "GET /page/10/detail").unwrap()),
                   "detail: 10");
        assert!(dispatch(&router, "GET /page/-10/detail").is_none());
    }

    #[test]
    fn mixed_captures() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/api/v<arg>/user/", MethodMask::ALL),
            |version: f32, user: u64| {
                format!("api {}v, user id - {}", version, user)
            }).unwrap();
        assert_eq!(
            body(&dispatch(&router, "GET /api/v5.1/user/10").unwrap()),
            "api 5.1v, user id - 10");
        assert_eq!(
            body(&dispatch(&router, "GET /api/v5./user/10").unwrap()),
            "api 5v, user id - 10");
        assert_eq!(
            body(&dispatch(&router, "GET /api/v6.0/user/11").unwrap()),
            "api 6v, user id - 11");
    }

    #[test]
    fn first_match_wins() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/item/", MethodMask::ALL),
            |name: String| format!("string: {}", name)).unwrap();
        router.add_rule(
            RouteRule::new("/item/", MethodMask::ALL),
            |id: u64| format!("number: {}", id)).unwrap();
        // both rules match "42"; insertion order decides
        assert_eq!(body(&dispatch(&router, "GET /item/42").unwrap()),
                   "string: 42");
    }

    #[test]
    fn rest_capture() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/static/<arg>", MethodMask::ALL),
            |path: Rest| format!("file: {}", path.0)).unwrap();
        assert_eq!(
            body(&dispatch(&router, "GET /static/css/site.css").unwrap()),
            "file: css/site.css");
    }

    #[test]
    fn percent_decoded_matching() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/name/", MethodMask::ALL),
            |name: String| name).unwrap();
        assert_eq!(body(&dispatch(&router, "GET /name/two%20words").unwrap()),
                   "two words");
    }

    #[test]
    fn guard_rule() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::with_guard("/search", MethodMask::ALL, |req| {
                req.url().query().map_or(false, |q| q.contains("q="))
            }),
            || "results").unwrap();
        assert_eq!(body(&dispatch(&router, "GET /search?q=term").unwrap()),
                   "results");
        assert!(dispatch(&router, "GET /search").is_none());
    }

    #[test]
    fn overflow_answers_not_found() {
        let mut router = Router::new();
        router.add_rule(
            RouteRule::new("/page/", MethodMask::ALL),
            |page: u16| format!("page: {}", page)).unwrap();
        let output = dispatch(&router, "GET /page/70000").unwrap();
        assert!(output.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn arity_mismatch_rejected() {
        let mut router: Router<MockData> = Router::new();
        let err = router.add_rule(
            RouteRule::new("/a/<arg>/b/<arg>", MethodMask::ALL),
            |x: i32| format!("{}", x)).unwrap_err();
        match err {
            RuleError::ArityMismatch(2, 1) => {}
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(router.rules(), 0);
    }

    #[test]
    fn unknown_converter_rejected() {
        #[derive(Debug)]
        struct Custom;
        impl PathCapture for Custom {
            fn fragment() -> &'static str { r"[a-z]+" }
            fn from_capture(_: &str) -> Option<Custom> { Some(Custom) }
        }

        let mut router: Router<MockData> = Router::new();
        let err = router.add_rule(
            RouteRule::new("/c/<arg>", MethodMask::ALL),
            |_c: Custom| "custom").unwrap_err();
        match err {
            RuleError::UnknownParameterType => {}
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(router.rules(), 0);

        // registering the converter first makes the same rule valid
        let mut router: Router<MockData> = Router::new();
        router.add_converter::<Custom>(Custom::fragment());
        router.add_rule(
            RouteRule::new("/c/<arg>", MethodMask::ALL),
            |_c: Custom| "custom").unwrap();
        assert_eq!(body(&dispatch(&router, "GET /c/abc").unwrap()),
                   "custom");
    }

    #[test]
    fn converters_frozen_after_first_rule() {
        let mut router: Router<MockData> = Router::new();
        router.add_rule(RouteRule::new("/", MethodMask::ALL), || "ok")
            .unwrap();
        let before = router.converters().len();
        router.clear_converters();
        assert_eq!(router.converters().len(), before);
    }
}
