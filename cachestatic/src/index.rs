//! Mapping requests to cache keys.

use http::HeaderMap;
use http::header::ACCEPT_ENCODING;

use crate::Request;

/// Maps a request to the key its response is cached under.
///
/// Indexing is total: every request gets a key. Closures of the form
/// `Fn(&Request) -> String` are indexers too.
pub trait Indexer: Send + Sync {
    /// Computes the cache key for `request`.
    fn index(&self, request: &Request) -> String;
}

impl<F> Indexer for F
where
    F: Fn(&Request) -> String + Send + Sync,
{
    fn index(&self, request: &Request) -> String {
        self(request)
    }
}

/// Keys requests by method and cleaned path, e.g. `GET:/assets/app.js`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIndexer;

impl Indexer for DefaultIndexer {
    fn index(&self, request: &Request) -> String {
        format!("{}:{}", request.method(), clean_path(request.uri().path()))
    }
}

/// Keys requests by method, negotiated encoding and cleaned path.
///
/// When the request accepts `encoding` the key becomes
/// `GET:gzip:/assets/app.js`, otherwise it is the [`DefaultIndexer`] key.
/// Use it when a compression layer sits between the cache and the handler,
/// so encoded and plain bodies never share an entry.
#[derive(Debug, Clone)]
pub struct EncodingIndexer {
    encoding: String,
}

impl EncodingIndexer {
    /// Creates an indexer for the given content-coding token.
    pub fn new(encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
        }
    }
}

impl Indexer for EncodingIndexer {
    fn index(&self, request: &Request) -> String {
        let path = clean_path(request.uri().path());
        if accepts_encoding(request.headers(), &self.encoding) {
            format!("{}:{}:{}", request.method(), self.encoding, path)
        } else {
            format!("{}:{}", request.method(), path)
        }
    }
}

/// Returns `true` if `Accept-Encoding` lists `encoding` with a non-zero weight.
fn accepts_encoding(headers: &HeaderMap, encoding: &str) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| {
            let mut parts = item.split(';');
            let token = parts.next().unwrap_or_default().trim();
            token.eq_ignore_ascii_case(encoding) && !parts.any(is_zero_weight)
        })
}

fn is_zero_weight(param: &str) -> bool {
    let Some((name, value)) = param.split_once('=') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("q")
        && value.trim().parse::<f32>().is_ok_and(|q| q == 0.0)
}

/// Returns the shortest path equivalent to `path`.
///
/// Repeated separators collapse, `.` segments vanish, `..` removes the
/// preceding segment (and is dropped at the root of an absolute path), and
/// trailing separators are trimmed. An empty result becomes `.`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_owned();
    }
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if !rooted => segments.push(".."),
                _ => {}
            },
            segment => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_owned()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use pretty_assertions::assert_eq;

    fn request(method: Method, uri: &str, accept: Option<&'static str>) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT_ENCODING, accept);
        }
        builder.body(Bytes::new()).unwrap()
    }

    #[test]
    fn clean_path_matches_canonical_cleaning() {
        let cases = [
            ("", "."),
            ("/", "/"),
            ("//", "/"),
            ("/a/b/c", "/a/b/c"),
            ("/a//b/./c/", "/a/b/c"),
            ("/a/b/../c", "/a/c"),
            ("/../a", "/a"),
            ("/a/../..", "/"),
            ("a/../..", ".."),
            ("../../x", "../../x"),
            ("./", "."),
        ];
        for (input, expected) in cases {
            assert_eq!(clean_path(input), expected, "cleaning {input:?}");
        }
    }

    #[test]
    fn default_index_combines_method_and_clean_path() {
        let key = DefaultIndexer.index(&request(Method::GET, "/static//app.js?v=3", None));
        assert_eq!(key, "GET:/static/app.js");

        let key = DefaultIndexer.index(&request(Method::HEAD, "/static/./x/../app.js", None));
        assert_eq!(key, "HEAD:/static/app.js");
    }

    #[test]
    fn encoding_index_separates_variants() {
        let indexer = EncodingIndexer::new("gzip");

        let plain = indexer.index(&request(Method::GET, "/a", None));
        let gzip = indexer.index(&request(Method::GET, "/a", Some("deflate, GZIP;q=0.8")));
        let refused = indexer.index(&request(Method::GET, "/a", Some("gzip;q=0, br")));

        assert_eq!(plain, "GET:/a");
        assert_eq!(gzip, "GET:gzip:/a");
        assert_eq!(refused, "GET:/a");
    }

    #[test]
    fn closures_are_indexers() {
        let indexer = |req: &Request| req.uri().path().to_owned();

        assert_eq!(indexer.index(&request(Method::GET, "/raw//path", None)), "/raw//path");
    }
}
