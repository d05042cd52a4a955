//! The network layer of the resolver.
//!
//! A [`Backend`][crate::backend::Backend] describes one lookup as a
//! [`Request`] and the [`query`] function executes it through a [`Client`],
//! retrying connection-level failures and classifying the final outcome into
//! the error taxonomy of [`ErrorKind`].

use std::{thread, time::Duration};

use log::{trace, warn};
use serde_json::Value;

use crate::{Error, ErrorKind};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// A descriptor for a single backend lookup, always an HTTP GET.
///
/// A `Request` is a pure function of the ISBN and the adapter configuration,
/// it holds no connection state and has no identity of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    url: String,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Creates a GET request for `url` with no headers.
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a header to the request.
    #[must_use]
    pub fn with_header<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The URL the request is sent to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The headers sent with the request.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// A raw HTTP response, the status code plus the body text.
#[derive(Clone, Debug)]
pub struct Response {
    status: u16,
    body: String,
}

impl Response {
    /// Creates a response from a status code and body text.
    pub fn new<S: Into<String>>(status: u16, body: S) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// The body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// A transport-level failure raised by a [`Client`].
///
/// `Connect` failures (connection refused, connect timeout) are the only
/// failures the query loop retries, everything else fails the query
/// immediately.
#[derive(Debug)]
pub enum TransportError {
    /// The connection could not be established.
    Connect(Box<dyn std::error::Error + Send + Sync>),
    /// Any other failure at the transport layer.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// The HTTP client used to execute backend requests.
pub trait Client
where
    Self: Default,
{
    /// Executes `request` and returns the raw response.
    ///
    /// # Errors
    /// [`TransportError::Connect`] when the connection could not be
    /// established, [`TransportError::Other`] for any other transport
    /// failure.
    fn execute(&self, request: &Request) -> Result<Response, TransportError>;
}

impl Client for reqwest::blocking::Client {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let mut builder = self.get(request.url());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                TransportError::Connect(e.into())
            } else {
                TransportError::Other(e.into())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::Other(e.into()))?;

        Ok(Response::new(status, body))
    }
}

/// Executes one logical query for a book record.
///
/// Connection-level failures are retried up to [`MAX_ATTEMPTS`] times in
/// total with a fixed [`RETRY_DELAY`] pause before each retry. The final
/// outcome is classified into the error taxonomy: an HTTP 404, an empty body
/// or a structurally empty JSON payload is the authoritative "no data for
/// this ISBN" answer, any other non-2xx status is a transient failure that is
/// not retried at this layer.
pub(crate) fn query<C: Client>(client: &C, request: &Request) -> Result<Value, Error> {
    query_with_delay(client, request, RETRY_DELAY)
}

fn query_with_delay<C: Client>(
    client: &C,
    request: &Request,
    delay: Duration,
) -> Result<Value, Error> {
    let url = request.url();
    let mut attempts_left = MAX_ATTEMPTS;

    let response = loop {
        match client.execute(request) {
            Ok(response) => break response,
            Err(TransportError::Connect(source)) => {
                attempts_left -= 1;
                if attempts_left == 0 {
                    warn!("Unable to access {url}, giving up after {MAX_ATTEMPTS} attempts");
                    return Err(Error::wrap_with(
                        ErrorKind::QueryFailed,
                        source,
                        format!("Unable to access URL {url}"),
                    ));
                }
                warn!(
                    "Encountered an error attempting to access {url}, retrying in {} seconds",
                    delay.as_secs()
                );
                thread::sleep(delay);
            }
            Err(TransportError::Other(source)) => {
                return Err(Error::wrap_with(
                    ErrorKind::QueryFailed,
                    source,
                    format!("Unable to access URL {url}"),
                ));
            }
        }
    };

    classify(url, &response)
}

fn classify(url: &str, response: &Response) -> Result<Value, Error> {
    let status = response.status();

    if status == 404 || response.body().is_empty() {
        trace!("No data received for URL {url}");
        return Err(Error::new(
            ErrorKind::NoBookData,
            format!("No data received for URL {url}"),
        ));
    }

    if !(200..300).contains(&status) {
        return Err(Error::new(
            ErrorKind::QueryFailed,
            format!("Received status code {status} accessing URL {url}"),
        ));
    }

    let raw: Value = serde_json::from_str(response.body()).map_err(|e| {
        Error::wrap_with(
            ErrorKind::Deserialize,
            e,
            format!("Response from {url} is not valid JSON"),
        )
    })?;

    if is_structurally_empty(&raw) {
        trace!("Empty payload received for URL {url}");
        return Err(Error::new(
            ErrorKind::NoBookData,
            format!("Empty payload received for URL {url}"),
        ));
    }

    Ok(raw)
}

fn is_structurally_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(entries) => entries.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
pub(crate) use test::{
    assert_url, impl_response_producer, mock_calls, MockClient, NotFoundProducer, Producer,
    URL_SINK,
};

#[cfg(test)]
mod test {

    use super::*;

    thread_local! {
        pub(crate) static URL_SINK: std::cell::RefCell<Option<String>> = std::cell::RefCell::new(None);
        pub(crate) static CALL_COUNT: std::cell::Cell<u32> = std::cell::Cell::new(0);
    }

    /// Asserts that the expected URL is the same as the one provided to the [`MockClient`].
    ///
    /// The [`MockClient`] will update the static thread local `URL_SINK` with the URL string that
    /// was passed to it, this allows for asserting that implementing functions or methods are
    /// building the correct URL.
    macro_rules! assert_url {
        ($expected: expr) => {
            assert_url!($expected, "");
        };
        ($expected: expr, $($arg: tt)+) => {
            let url = crate::api::URL_SINK.with(|url| url.borrow().clone().unwrap_or_default());
            assert_eq!($expected, url, $($arg)+);
        };
    }

    /// The number of times any [`MockClient`] was invoked on this thread.
    ///
    /// Tests run on their own threads so the count is isolated per test.
    pub(crate) fn mock_calls() -> u32 {
        CALL_COUNT.with(std::cell::Cell::get)
    }

    pub(crate) trait Producer
    where
        Self: Default,
    {
        fn produce() -> Result<Response, TransportError>;
    }

    #[derive(Default)]
    pub(crate) struct MockClient<P: Producer = NotFoundProducer> {
        _producer: std::marker::PhantomData<P>,
    }

    impl<P: Producer> Client for MockClient<P> {
        fn execute(&self, request: &Request) -> Result<Response, TransportError> {
            URL_SINK.with(|sink| *sink.borrow_mut() = Some(request.url().to_owned()));
            CALL_COUNT.with(|count| count.set(count.get() + 1));
            P::produce()
        }
    }

    pub(crate) fn connect_refused() -> TransportError {
        TransportError::Connect(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    macro_rules! impl_response_producer {
        ($($producer:ident => $exp:expr,)*) => {
            $(
                #[derive(Default)]
                pub(crate) struct $producer;

                impl crate::api::Producer for $producer {
                    fn produce() -> Result<crate::api::Response, crate::api::TransportError> {
                        $exp
                    }
                }
            )*
        };
    }
    impl_response_producer! {
        NotFoundProducer => Ok(Response::new(404, "")),
    }

    pub(crate) use assert_url;
    pub(crate) use impl_response_producer;

    impl_response_producer! {
        EmptyBodyProducer => Ok(Response::new(200, "")),
        EmptyObjectProducer => Ok(Response::new(200, "{}")),
        ServerErrorProducer => Ok(Response::new(500, "Internal Server Error")),
        ConnectErrorProducer => Err(connect_refused()),
        InvalidJsonProducer => Ok(Response::new(200, "not json")),
        BookProducer => Ok(Response::new(200, r#"{"title": "Matilda"}"#)),
    }

    fn query_now<C: Client>() -> Result<Value, Error> {
        let client = C::default();
        let request = Request::new("http://localhost/book");
        query_with_delay(&client, &request, Duration::ZERO)
    }

    #[test]
    fn success_returns_decoded_payload() {
        let value = query_now::<MockClient<BookProducer>>().unwrap();

        assert_eq!("Matilda", value["title"]);
        assert_eq!(1, mock_calls());
    }

    #[test]
    fn http_404_is_no_book_data_without_retry() {
        let err = query_now::<MockClient<NotFoundProducer>>().unwrap_err();

        assert_eq!(ErrorKind::NoBookData, err.kind());
        assert_eq!(1, mock_calls());
    }

    #[test]
    fn empty_body_is_no_book_data() {
        let err = query_now::<MockClient<EmptyBodyProducer>>().unwrap_err();

        assert_eq!(ErrorKind::NoBookData, err.kind());
    }

    #[test]
    fn empty_json_payload_is_no_book_data() {
        let err = query_now::<MockClient<EmptyObjectProducer>>().unwrap_err();

        assert_eq!(ErrorKind::NoBookData, err.kind());
    }

    #[test]
    fn http_500_is_query_failed_without_retry() {
        let err = query_now::<MockClient<ServerErrorProducer>>().unwrap_err();

        assert_eq!(ErrorKind::QueryFailed, err.kind());
        assert_eq!(1, mock_calls());
    }

    #[test]
    fn invalid_json_is_deserialize_error() {
        let err = query_now::<MockClient<InvalidJsonProducer>>().unwrap_err();

        assert_eq!(ErrorKind::Deserialize, err.kind());
    }

    #[test]
    fn connection_failures_exhaust_the_retry_budget() {
        let err = query_now::<MockClient<ConnectErrorProducer>>().unwrap_err();

        assert_eq!(ErrorKind::QueryFailed, err.kind());
        assert_eq!(MAX_ATTEMPTS, mock_calls());
    }

    #[derive(Default)]
    struct FlakyProducer;

    impl Producer for FlakyProducer {
        fn produce() -> Result<Response, TransportError> {
            // Fails to connect twice, then succeeds.
            if mock_calls() <= 2 {
                Err(connect_refused())
            } else {
                Ok(Response::new(200, r#"{"title": "Matilda"}"#))
            }
        }
    }

    #[test]
    fn connection_failures_are_retried_until_success() {
        let value = query_now::<MockClient<FlakyProducer>>().unwrap();

        assert_eq!("Matilda", value["title"]);
        assert_eq!(3, mock_calls());
    }

    #[test]
    fn request_headers_are_kept_in_order() {
        let request = Request::new("http://localhost")
            .with_header("Authorization", "key")
            .with_header("Accept", "application/json");

        assert_eq!(
            &[
                ("Authorization".to_owned(), "key".to_owned()),
                ("Accept".to_owned(), "application/json".to_owned())
            ],
            request.headers()
        );
    }
}
