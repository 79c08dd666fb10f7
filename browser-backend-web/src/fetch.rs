use std::cell::Cell;
use std::rc::Rc;

use browser_backend_core::{BackendError, WebInputStream, WebRequest, WebResponse};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, Request, RequestInit, RequestRedirect, Response};

fn fetch_error(what: &str, e: JsValue) -> BackendError {
    BackendError::Resource(format!("{}: {:?}", what, e))
}

fn response_headers(headers: &Headers) -> Vec<(String, String)> {
    let Ok(Some(entries)) = js_sys::try_iter(headers.as_ref()) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let pair = Array::from(&entry);
            Some((pair.get(0).as_string()?, pair.get(1).as_string()?))
        })
        .collect()
}

/// Run `request` through `window.fetch` and load the whole body.
///
/// The connection timeout aborts the request and reports `Timeout`. Browsers
/// do not expose a redirect count, so any limit of zero refuses redirects
/// and other limits follow them.
pub async fn fetch(request: &WebRequest) -> Result<WebResponse, BackendError> {
    let window = web_sys::window().ok_or_else(|| BackendError::Resource("no window".into()))?;

    let init = RequestInit::new();
    init.set_method(request.method());

    let headers = Headers::new().map_err(|e| fetch_error("failed to create headers", e))?;
    for (key, value) in request.request_headers() {
        headers
            .append(&key, &value)
            .map_err(|e| fetch_error("invalid request header", e))?;
    }
    init.set_headers(headers.as_ref());

    if !request.body().is_empty() {
        init.set_body(Uint8Array::from(request.body()).as_ref());
    }
    if request.max_redirects() == 0 {
        init.set_redirect(RequestRedirect::Error);
    }

    let abort = AbortController::new().map_err(|e| fetch_error("failed to create abort controller", e))?;
    init.set_signal(Some(&abort.signal()));

    let js_request =
        Request::new_with_str_and_init(request.url(), &init).map_err(|e| fetch_error("invalid request", e))?;

    let timed_out = Rc::new(Cell::new(false));
    let timer = match request.timeout() {
        Some(timeout) => {
            let flag = Rc::clone(&timed_out);
            let on_timeout = Closure::once_into_js(move || {
                flag.set(true);
                abort.abort();
            });
            let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
            let handle = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(on_timeout.unchecked_ref(), millis)
                .map_err(|e| fetch_error("failed to arm request timeout", e))?;
            Some(handle)
        }
        None => None,
    };

    let outcome = JsFuture::from(window.fetch_with_request(&js_request)).await;
    if let Some(handle) = timer {
        window.clear_timeout_with_handle(handle);
    }

    let response: Response = match outcome {
        Ok(value) => value
            .dyn_into()
            .map_err(|e| fetch_error("fetch resolved to a non-response", e))?,
        Err(_) if timed_out.get() => return Err(BackendError::Timeout),
        Err(e) => return Err(fetch_error("fetch failed", e)),
    };

    let buffer = response
        .array_buffer()
        .map_err(|e| fetch_error("failed to read response body", e))?;
    let body = JsFuture::from(buffer)
        .await
        .map_err(|e| fetch_error("failed to read response body", e))?;

    Ok(WebResponse {
        status: response.status(),
        headers: response_headers(&response.headers()),
        body: Uint8Array::new(&body).to_vec(),
    })
}

/// Fetch `request` and wrap the outcome in a readable stream.
pub async fn open_web_input_stream(request: WebRequest) -> WebInputStream {
    let mut stream = WebInputStream::new(request);
    let outcome = fetch(stream.request()).await;
    stream.complete(outcome);
    stream
}
