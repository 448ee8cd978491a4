use mapservice::{ScriptHost, ScriptId, ServiceError};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, HtmlScriptElement};
use widget::ShellView;

/// Id of the element holding the distance sentence.
pub const DISTANCE_INFO_ID: &str = "distance-info";

pub struct DomScriptHost<'a> {
    pub document: &'a Document,
}

fn scripts(document: &Document) -> Vec<HtmlScriptElement> {
    let collection = document.get_elements_by_tag_name("script");
    (0..collection.length())
        .filter_map(|i| collection.item(i))
        .filter_map(|el| el.dyn_into::<HtmlScriptElement>().ok())
        .collect()
}

/// First script element whose source starts with `url`.
pub fn find_script(document: &Document, url: &str) -> Option<HtmlScriptElement> {
    scripts(document).into_iter().find(|s| s.src().starts_with(url))
}

impl ScriptHost for DomScriptHost<'_> {
    fn script_sources(&self) -> Vec<(ScriptId, String)> {
        scripts(self.document)
            .iter()
            .enumerate()
            .map(|(idx, s)| (ScriptId(idx as u32), s.src()))
            .collect()
    }

    fn insert_script(&mut self, src: &str) -> Result<ScriptId, ServiceError> {
        let id = ScriptId(scripts(self.document).len() as u32);
        let script = self
            .document
            .create_element("script")
            .map_err(|e| ServiceError::Provider(format!("{e:?}")))?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|_| ServiceError::Provider("not a script element".to_string()))?;
        script.set_src(src);
        script.set_async(true);
        script.set_defer(true);
        let body = self
            .document
            .body()
            .ok_or_else(|| ServiceError::Provider("document has no body".to_string()))?;
        body.append_child(&script)
            .map_err(|e| ServiceError::Provider(format!("{e:?}")))?;
        Ok(id)
    }
}

/// Whether `google.maps` is already defined on the window.
pub fn binding_present() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    js_sys::Reflect::get(&window, &JsValue::from_str("google"))
        .ok()
        .filter(|g| g.is_object())
        .and_then(|g| js_sys::Reflect::get(&g, &JsValue::from_str("maps")).ok())
        .is_some_and(|m| m.is_object())
}

pub fn render_view(document: &Document, container_id: &str, view: &ShellView) -> Result<(), JsValue> {
    if let Some(container) = document
        .get_element_by_id(container_id)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    {
        container.set_hidden(!view.show_map);
    }

    let info = match document.get_element_by_id(DISTANCE_INFO_ID) {
        Some(el) => el,
        None => {
            let el = document.create_element("div")?;
            el.set_id(DISTANCE_INFO_ID);
            el.set_class_name(DISTANCE_INFO_ID);
            if let Some(body) = document.body() {
                body.append_child(&el)?;
            }
            el
        }
    };
    info.set_text_content(view.distance_sentence.as_deref());
    if let Ok(html) = info.dyn_into::<HtmlElement>() {
        html.set_hidden(view.distance_sentence.is_none());
    }
    Ok(())
}
