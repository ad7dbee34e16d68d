//! The client facade: base-URI resolution, default options, and the two
//! framework middlewares (content negotiation + error mapping, then
//! transport dispatch) kept innermost behind every user middleware.

use std::sync::Arc;

use url::Url;

use crate::codec;
use crate::data::{
    Body, Context, Headers, Method, Payload, Request, RequestOptions, Response, ResponseType,
};
use crate::error::{Error, HttpError, Result};
use crate::stack::{Middleware, Next, Stack};
use crate::transport::streaming::StreamingTransport;
use crate::transport::{Transport, TransportRequest};

/// An HTTP client composing the middleware stack with a transport strategy
/// and the content codec.
///
/// Construction installs two framework middlewares as the permanent tail of
/// the stack: a default middleware (body serialization on the way down,
/// status-to-error mapping on the way back) and a dispatch middleware
/// (URL resolution + transport invocation). Middlewares added with
/// [`use_ware`](Self::use_ware) always wrap that tail.
pub struct HttpClient<T: Transport = StreamingTransport> {
    stack: Stack<Context>,
    transport: Arc<T>,
    base_uri: Option<Url>,
    options: RequestOptions,
}

/// Builder for [`HttpClient`]. Register middlewares and issue requests only
/// after `build()`; the framework tail is assembled there.
pub struct HttpClientBuilder<T: Transport> {
    transport: T,
    base_uri: Option<String>,
    options: RequestOptions,
}

impl HttpClient<StreamingTransport> {
    /// A client over the default streaming strategy.
    pub fn new() -> Result<Self> {
        Ok(Self::builder(StreamingTransport::new()?).build()?)
    }
}

impl<T: Transport> HttpClient<T> {
    pub fn builder(transport: T) -> HttpClientBuilder<T> {
        HttpClientBuilder {
            transport,
            base_uri: None,
            options: RequestOptions::default(),
        }
    }

    /// A client over an explicit transport strategy with default options.
    pub fn with_transport(transport: T) -> Self {
        Self::assemble(transport, None, RequestOptions::default())
    }

    fn assemble(transport: T, base_uri: Option<Url>, options: RequestOptions) -> Self {
        let transport = Arc::new(transport);
        let mut stack = Stack::new();
        stack.push_tail(default_ware);
        stack.push_tail(dispatch_ware(
            transport.clone(),
            base_uri.clone(),
            options.clone(),
        ));
        HttpClient {
            stack,
            transport,
            base_uri,
            options,
        }
    }

    pub fn base_uri(&self) -> Option<&Url> {
        self.base_uri.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The options merged under every request's own.
    pub fn default_options(&self) -> &RequestOptions {
        &self.options
    }

    /// Append a middleware. It executes before (and unwinds after) the
    /// framework tail, never the reverse. Register middlewares before
    /// issuing requests.
    pub fn use_ware(&mut self, ware: impl Middleware<Context> + 'static) -> &mut Self {
        self.stack.use_ware(ware);
        self
    }

    /// Attach a conditional sub-stack; see [`Stack::mount`].
    pub fn mount<P>(&mut self, predicate: P, sub: Stack<Context>) -> &mut Self
    where
        P: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.stack.mount(predicate, sub);
        self
    }

    /// Execute one request through the middleware stack. A fresh [`Context`]
    /// is created per call; the caller's headers are copied, never aliased.
    pub async fn request(&self, request: Request) -> Result<Response> {
        let ctx = self.stack.execute(Context::new(request)).await?;
        Ok(ctx.response)
    }

    /// `HEAD` a resource; resolves to the response headers.
    pub async fn head(
        &self,
        path: impl Into<String>,
        headers: Headers,
        options: RequestOptions,
    ) -> Result<Headers> {
        let response = self
            .request(
                Request::new(Method::Head, path)
                    .headers(headers)
                    .options(options),
            )
            .await?;
        Ok(response.headers)
    }

    pub async fn get(
        &self,
        path: impl Into<String>,
        headers: Headers,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(
            Request::new(Method::Get, path)
                .headers(headers)
                .options(options),
        )
        .await
    }

    pub async fn post(
        &self,
        path: impl Into<String>,
        body: Body,
        headers: Headers,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(
            Request::new(Method::Post, path)
                .body(body)
                .headers(headers)
                .options(options),
        )
        .await
    }

    pub async fn put(
        &self,
        path: impl Into<String>,
        body: Body,
        headers: Headers,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(
            Request::new(Method::Put, path)
                .body(body)
                .headers(headers)
                .options(options),
        )
        .await
    }

    pub async fn patch(
        &self,
        path: impl Into<String>,
        body: Body,
        headers: Headers,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(
            Request::new(Method::Patch, path)
                .body(body)
                .headers(headers)
                .options(options),
        )
        .await
    }

    /// `DELETE` a resource; resolves to the response headers.
    pub async fn delete(
        &self,
        path: impl Into<String>,
        headers: Headers,
        options: RequestOptions,
    ) -> Result<Headers> {
        let response = self
            .request(
                Request::new(Method::Delete, path)
                    .headers(headers)
                    .options(options),
            )
            .await?;
        Ok(response.headers)
    }
}

impl<T: Transport> HttpClientBuilder<T> {
    /// Base URI against which relative request paths resolve.
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Default options applied to every request unless overridden per call.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<HttpClient<T>> {
        let base_uri = self
            .base_uri
            .map(|raw| Url::parse(&raw).map_err(|e| Error::InvalidUrl(e.to_string())))
            .transpose()?;
        Ok(HttpClient::assemble(self.transport, base_uri, self.options))
    }
}

/// Framework middleware #1: serialize structured bodies on the way down,
/// map status > 299 to [`HttpError`] on the way back. This is the sole
/// error-raising path for a successful round-trip.
async fn default_ware(mut ctx: Context, next: Next<Context>) -> Result<Context> {
    if ctx.request.method.accepts_body() && ctx.request.body.is_structured() {
        let declared = ctx
            .request
            .headers
            .get_str("Content-Type")
            .map(str::to_owned);
        let defaulted_json = declared.is_none() && matches!(ctx.request.body, Body::Json(_));
        let body = std::mem::take(&mut ctx.request.body);
        let encoded = codec::serialize_body(body, declared.as_deref())?;

        if let Some(content_type) = encoded.content_type {
            // A produced type only fills a gap or refines the declared type
            // with parameters (multipart boundaries).
            let refine = declared
                .as_deref()
                .is_none_or(|declared| content_type.starts_with(declared));
            if refine {
                ctx.request.headers.insert("Content-Type", content_type);
            }
        }
        if defaulted_json && ctx.request.options.response_type.is_none() {
            ctx.request.options.response_type = Some(ResponseType::Json);
        }
        ctx.request.body = match encoded.payload {
            Payload::Bytes(data) => Body::Bytes(data),
            Payload::Stream(stream) => Body::Stream(stream),
        };
    }

    let ctx = next.run(ctx).await?;

    if ctx.response.status > 299 {
        let Context { request, response } = ctx;
        return Err(HttpError {
            status: response.status,
            status_text: response.status_text.clone(),
            request,
            response,
        }
        .into_error());
    }
    Ok(ctx)
}

/// Framework middleware #2: resolve the absolute URL, invoke the transport,
/// and merge the settled response into the context. Always the innermost
/// link of the chain.
fn dispatch_ware<T: Transport>(
    transport: Arc<T>,
    base_uri: Option<Url>,
    defaults: RequestOptions,
) -> impl Middleware<Context> {
    move |mut ctx: Context, _next: Next<Context>| {
        let transport = transport.clone();
        let base_uri = base_uri.clone();
        let defaults = defaults.clone();
        async move {
            let url = resolve_url(base_uri.as_ref(), &ctx.request.path)?;
            let options = ctx.request.options.clone().merge(&defaults);
            let body = std::mem::take(&mut ctx.request.body);
            let payload = into_payload(body)?;

            let descriptor = TransportRequest {
                method: ctx.request.method,
                url,
                headers: ctx.request.headers.clone(),
                body: payload,
                response_type: options.response_type,
                with_credentials: options.credentials.unwrap_or(false),
                timeout: options.timeout,
                cancel: ctx.request.cancel.clone(),
            };

            let result = transport.send(descriptor).await?;
            ctx.response = result.response.await?;
            Ok(ctx)
        }
    }
}

fn resolve_url(base_uri: Option<&Url>, path: &str) -> Result<Url> {
    match base_uri {
        Some(base) => base.join(path),
        None => Url::parse(path),
    }
    .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
}

/// Lower whatever body is left at dispatch time onto the wire. Bodies the
/// default middleware already serialized arrive as bytes or streams;
/// anything else (user middleware swaps, bodies on GET) is serialized here
/// against the declared content type.
fn into_payload(body: Body) -> Result<Option<Payload>> {
    match body {
        Body::None => Ok(None),
        Body::Bytes(data) => Ok(Some(Payload::Bytes(data))),
        Body::Stream(stream) => Ok(Some(Payload::Stream(stream))),
        Body::Text(text) => Ok(Some(Payload::Bytes(text.into_bytes().into()))),
        other => Ok(Some(codec::serialize_body(other, None)?.payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths_against_base() {
        let base = Url::parse("https://api.test/v1/").unwrap();
        let url = resolve_url(Some(&base), "users/1").unwrap();
        assert_eq!(url.as_str(), "https://api.test/v1/users/1");
    }

    #[test]
    fn absolute_paths_ignore_base() {
        let base = Url::parse("https://api.test/v1/").unwrap();
        let url = resolve_url(Some(&base), "https://other.test/x").unwrap();
        assert_eq!(url.as_str(), "https://other.test/x");
    }

    #[test]
    fn relative_path_without_base_is_invalid() {
        let err = resolve_url(None, "users/1").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
