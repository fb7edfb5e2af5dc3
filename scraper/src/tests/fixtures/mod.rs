use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::driver::{id_selector, Element, FormDriver};
use crate::errors::DriverError;
use crate::page::DOWNLOAD_BUTTON_SELECTOR;
use crate::trigger::{DOWNLOAD_BUTTON_ID, PERIOD_SELECT_ID, YEAR_SELECT_ID};

/// Write a zip archive holding `entries` (name, bytes) to `path`.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create zip fixture");
    let mut writer = zip::ZipWriter::new(file);
    for (name, bytes) in entries {
        let options = zip::write::SimpleFileOptions::default();
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("add directory");
        } else {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(bytes).expect("write zip entry");
        }
    }
    writer.finish().expect("finish zip fixture");
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Goto(String),
    SetTimeouts(Duration, Duration),
    Select(String, String),
    Click(String),
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub tag: String,
    pub input_type: Option<String>,
    pub selected: bool,
    pub value: Option<String>,
}

impl FakeElement {
    pub fn checkbox(selected: bool) -> Self {
        FakeElement {
            tag: "input".to_string(),
            input_type: Some("checkbox".to_string()),
            selected,
            value: None,
        }
    }

    pub fn select() -> Self {
        FakeElement {
            tag: "select".to_string(),
            input_type: None,
            selected: false,
            value: None,
        }
    }

    pub fn button() -> Self {
        FakeElement {
            tag: "input".to_string(),
            input_type: Some("submit".to_string()),
            selected: false,
            value: None,
        }
    }
}

type DownloadHook = Box<dyn FnMut(&str, &str)>;

/// In-memory stand-in for the field selection page.
pub struct FakeDriver {
    pub elements: HashMap<String, FakeElement>,
    pub actions: Vec<Action>,
    /// Number of readiness probes that report the button as not clickable.
    pub not_clickable_for: usize,
    pub fail_clicks_on: Option<String>,
    on_download: Option<DownloadHook>,
}

impl FakeDriver {
    pub fn new() -> Self {
        FakeDriver {
            elements: HashMap::new(),
            actions: Vec::new(),
            not_clickable_for: 0,
            fail_clicks_on: None,
            on_download: None,
        }
    }

    /// A page with the year/period selects, the download button and the
    /// given checkboxes.
    pub fn with_form(checkboxes: &[(&str, bool)]) -> Self {
        let mut driver = FakeDriver::new();
        driver.insert(YEAR_SELECT_ID, FakeElement::select());
        driver.insert(PERIOD_SELECT_ID, FakeElement::select());
        driver.insert(DOWNLOAD_BUTTON_ID, FakeElement::button());
        for (id, selected) in checkboxes {
            driver.insert(id, FakeElement::checkbox(*selected));
        }
        driver
    }

    pub fn insert(&mut self, id: &str, element: FakeElement) {
        self.elements.insert(id.to_string(), element);
    }

    /// Called with the selected (year, period) values when the download
    /// button is clicked.
    pub fn on_download<F: FnMut(&str, &str) + 'static>(mut self, hook: F) -> Self {
        self.on_download = Some(Box::new(hook));
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Click(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.elements.get(id).map_or(false, |e| e.selected)
    }

    fn element(&mut self, element: &Element) -> Result<&mut FakeElement, DriverError> {
        self.elements
            .get_mut(&element.0)
            .ok_or_else(|| no_such_element(&element.0))
    }
}

pub fn no_such_element(what: &str) -> DriverError {
    DriverError::Protocol {
        error: "no such element".to_string(),
        message: format!("Unable to locate element: {}", what),
    }
}

impl FormDriver for FakeDriver {
    fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.actions.push(Action::Goto(url.to_string()));
        Ok(())
    }

    fn set_timeouts(&mut self, page_load: Duration, script: Duration) -> Result<(), DriverError> {
        self.actions.push(Action::SetTimeouts(page_load, script));
        Ok(())
    }

    fn find_by_css(&mut self, selector: &str) -> Result<Element, DriverError> {
        let id = if selector == DOWNLOAD_BUTTON_SELECTOR {
            DOWNLOAD_BUTTON_ID.to_string()
        } else {
            self.elements
                .keys()
                .find(|id| id_selector(id) == selector)
                .cloned()
                .ok_or_else(|| no_such_element(selector))?
        };
        if !self.elements.contains_key(&id) {
            return Err(no_such_element(selector));
        }
        Ok(Element(id))
    }

    fn tag_name(&mut self, element: &Element) -> Result<String, DriverError> {
        Ok(self.element(element)?.tag.clone())
    }

    fn attribute(
        &mut self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let fake = self.element(element)?;
        Ok(match name {
            "type" => fake.input_type.clone(),
            "value" => fake.value.clone(),
            _ => None,
        })
    }

    fn is_selected(&mut self, element: &Element) -> Result<bool, DriverError> {
        Ok(self.element(element)?.selected)
    }

    fn is_clickable(&mut self, element: &Element) -> Result<bool, DriverError> {
        self.element(element)?;
        if self.not_clickable_for > 0 {
            self.not_clickable_for -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    fn click(&mut self, element: &Element) -> Result<(), DriverError> {
        if self.fail_clicks_on.as_deref() == Some(element.0.as_str()) {
            return Err(DriverError::Protocol {
                error: "element click intercepted".to_string(),
                message: format!("{} is covered", element.0),
            });
        }
        let fake = self.element(element)?;
        if fake.input_type.as_deref() == Some("checkbox") {
            fake.selected = !fake.selected;
        }
        self.actions.push(Action::Click(element.0.clone()));

        if element.0 == DOWNLOAD_BUTTON_ID {
            let year = self.selected_value(YEAR_SELECT_ID);
            let period = self.selected_value(PERIOD_SELECT_ID);
            if let Some(hook) = self.on_download.as_mut() {
                hook(&year, &period);
            }
        }
        Ok(())
    }

    fn select_by_value(&mut self, element: &Element, value: &str) -> Result<(), DriverError> {
        self.element(element)?.value = Some(value.to_string());
        self.actions
            .push(Action::Select(element.0.clone(), value.to_string()));
        Ok(())
    }
}

impl FakeDriver {
    fn selected_value(&self, id: &str) -> String {
        self.elements
            .get(id)
            .and_then(|e| e.value.clone())
            .unwrap_or_default()
    }
}
