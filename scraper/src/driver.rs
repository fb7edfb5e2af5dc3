use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use crate::errors::DriverError;

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque reference to an element in the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub String);

/// The browser interactions the page controller and download trigger need.
pub trait FormDriver {
    fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    fn set_timeouts(&mut self, page_load: Duration, script: Duration) -> Result<(), DriverError>;

    fn find_by_css(&mut self, selector: &str) -> Result<Element, DriverError>;

    fn find_by_id(&mut self, id: &str) -> Result<Element, DriverError> {
        self.find_by_css(&id_selector(id))
    }

    fn tag_name(&mut self, element: &Element) -> Result<String, DriverError>;

    fn attribute(&mut self, element: &Element, name: &str)
        -> Result<Option<String>, DriverError>;

    fn is_selected(&mut self, element: &Element) -> Result<bool, DriverError>;

    /// Displayed and enabled.
    fn is_clickable(&mut self, element: &Element) -> Result<bool, DriverError>;

    fn click(&mut self, element: &Element) -> Result<(), DriverError>;

    /// Selects the `<option>` of a `<select>` whose value attribute matches.
    fn select_by_value(&mut self, element: &Element, value: &str) -> Result<(), DriverError>;
}

/// `[id="cboYear"]`, the selector WebDriver clients use for lookups by id.
pub fn id_selector(id: &str) -> String {
    format!("[id=\"{}\"]", escape_css_string(id))
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl DriverError {
    /// Element lookups that may succeed once the page finishes rendering.
    pub fn is_not_yet_present(&self) -> bool {
        matches!(self, DriverError::Protocol { error, .. }
            if error == "no such element" || error == "stale element reference")
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub webdriver_url: String,
    pub headless: bool,
    /// Upper bound on a single WebDriver command. Must exceed the page-load
    /// timeout, since a click that starts an export blocks for that long.
    pub command_timeout: Duration,
}

/// A Chrome session on a W3C WebDriver endpoint (chromedriver).
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    closed: bool,
}

impl WebDriverSession {
    /// Starts a session that downloads into `download_dir` without prompting.
    pub fn start(options: &SessionOptions, download_dir: &Path) -> Result<Self, DriverError> {
        let client = Client::builder()
            .timeout(options.command_timeout)
            .build()?;
        let base_url = options.webdriver_url.trim_end_matches('/').to_string();

        let payload = send(
            &client,
            Method::POST,
            &format!("{}/session", base_url),
            Some(&new_session_body(download_dir, options.headless)),
        )?;
        let session_id = payload
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or(DriverError::MissingField("sessionId"))?
            .to_string();
        debug!("Started WebDriver session {}", session_id);

        Ok(WebDriverSession {
            client,
            base_url,
            session_id,
            closed: false,
        })
    }

    pub fn close(mut self) -> Result<(), DriverError> {
        self.delete_session()
    }

    fn delete_session(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        send::<Value>(
            &self.client,
            Method::DELETE,
            &format!("{}/session/{}", self.base_url, self.session_id),
            None,
        )?;
        debug!("Closed WebDriver session {}", self.session_id);
        Ok(())
    }

    fn command<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, DriverError> {
        let url = format!("{}/session/{}/{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body)
    }

    fn get(&self, path: &str) -> Result<Value, DriverError> {
        self.command::<Value>(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: Value) -> Result<Value, DriverError> {
        self.command(Method::POST, path, Some(&body))
    }

    fn get_bool(&self, path: &str) -> Result<bool, DriverError> {
        self.get(path)?
            .as_bool()
            .ok_or(DriverError::MissingField("boolean value"))
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if let Err(e) = self.delete_session() {
            warn!("Failed to close WebDriver session {}: {}", self.session_id, e);
        }
    }
}

impl FormDriver for WebDriverSession {
    fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.post("url", json!({ "url": url }))?;
        Ok(())
    }

    fn set_timeouts(&mut self, page_load: Duration, script: Duration) -> Result<(), DriverError> {
        self.post(
            "timeouts",
            json!({
                "pageLoad": page_load.as_millis() as u64,
                "script": script.as_millis() as u64,
            }),
        )?;
        Ok(())
    }

    fn find_by_css(&mut self, selector: &str) -> Result<Element, DriverError> {
        let value = self.post(
            "element",
            json!({ "using": "css selector", "value": selector }),
        )?;
        element_from_value(&value)
    }

    fn tag_name(&mut self, element: &Element) -> Result<String, DriverError> {
        self.get(&format!("element/{}/name", element.0))?
            .as_str()
            .map(str::to_lowercase)
            .ok_or(DriverError::MissingField("tag name"))
    }

    fn attribute(
        &mut self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self.get(&format!("element/{}/attribute/{}", element.0, name))?;
        Ok(value.as_str().map(str::to_string))
    }

    fn is_selected(&mut self, element: &Element) -> Result<bool, DriverError> {
        self.get_bool(&format!("element/{}/selected", element.0))
    }

    fn is_clickable(&mut self, element: &Element) -> Result<bool, DriverError> {
        Ok(self.get_bool(&format!("element/{}/displayed", element.0))?
            && self.get_bool(&format!("element/{}/enabled", element.0))?)
    }

    fn click(&mut self, element: &Element) -> Result<(), DriverError> {
        self.post(&format!("element/{}/click", element.0), json!({}))?;
        Ok(())
    }

    fn select_by_value(&mut self, element: &Element, value: &str) -> Result<(), DriverError> {
        let option = element_from_value(&self.post(
            &format!("element/{}/element", element.0),
            json!({
                "using": "css selector",
                "value": format!("option[value=\"{}\"]", escape_css_string(value)),
            }),
        )?)?;
        if !self.is_selected(&option)? {
            self.click(&option)?;
        }
        Ok(())
    }
}

fn send<B: Serialize>(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<&B>,
) -> Result<Value, DriverError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(body);
    }
    let response = request.send()?;
    let ok = response.status().is_success();
    let payload: Value = response.json()?;
    unwrap_response(ok, payload)
}

/// Every WebDriver response wraps its result in `{"value": ...}`; failures
/// carry `{"value": {"error": ..., "message": ...}}`.
pub fn unwrap_response(ok: bool, mut payload: Value) -> Result<Value, DriverError> {
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .ok_or(DriverError::MissingField("value"))?;

    if ok {
        return Ok(value);
    }

    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Err(DriverError::Protocol {
        error: field("error"),
        message: field("message"),
    })
}

pub fn element_from_value(value: &Value) -> Result<Element, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| Element(id.to_string()))
        .ok_or(DriverError::MissingField("element reference"))
}

pub fn new_session_body(download_dir: &Path, headless: bool) -> Value {
    let mut args = vec!["--window-size=1920,1080"];
    if headless {
        args.push("--headless=new");
    }
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": args,
                    "prefs": {
                        "download.default_directory": download_dir.to_string_lossy(),
                        "download.prompt_for_download": false,
                        "download.directory_upgrade": true,
                        "safebrowsing.enabled": true,
                    },
                },
            },
        },
    })
}
