use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Input,
    Change,
    Click,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomEvent {
    pub target: NodeId,
    pub kind: EventKind,
}

impl DomEvent {
    pub fn new(target: NodeId, kind: EventKind) -> Self {
        Self { target, kind }
    }
}

/// The page as seen by the bindings: tagged elements to read and nodes to write.
pub trait Surface {
    fn body_attr(&self, name: &str) -> Option<String>;
    fn element_by_id(&self, id: &str) -> Option<NodeId>;
    /// Elements carrying `attr`, in document order, optionally below `within`.
    fn query_attr(&self, attr: &str, within: Option<NodeId>) -> Vec<NodeId>;
    fn query_tag(&self, tag: &str, within: Option<NodeId>) -> Vec<NodeId>;
    fn query_class(&self, class: &str, within: Option<NodeId>) -> Vec<NodeId>;
    fn tag(&self, node: NodeId) -> String;
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    /// DOM `contains`: true for the node itself and its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    fn value(&self, node: NodeId) -> String;
    fn set_value(&mut self, node: NodeId, value: &str);
    fn checked(&self, node: NodeId) -> bool;
    fn set_checked(&mut self, node: NodeId, checked: bool);
    fn text(&self, node: NodeId) -> String;
    fn set_text(&mut self, node: NodeId, text: &str);
    fn set_list(&mut self, node: NodeId, items: &[String]);
    fn style(&self, node: NodeId, property: &str) -> Option<String>;
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn toggle_class(&mut self, node: NodeId, class: &str, on: bool);

    fn query_attr_value(&self, attr: &str, value: &str, within: Option<NodeId>) -> Vec<NodeId> {
        self.query_attr(attr, within)
            .into_iter()
            .filter(|node| self.attr(*node, attr).as_deref() == Some(value))
            .collect()
    }

    fn first_attr_value(&self, attr: &str, value: &str, within: Option<NodeId>) -> Option<NodeId> {
        self.query_attr_value(attr, value, within)
            .into_iter()
            .next()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    #[serde(skip)]
    pub parent: Option<NodeId>,
    pub text: String,
    pub value: String,
    pub checked: bool,
    pub classes: BTreeSet<String>,
    pub style: BTreeMap<String, String>,
    pub items: Vec<String>,
}

/// An element arena parsed from static HTML; stands in for the browser DOM.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessDom {
    elements: Vec<Element>,
}

impl HeadlessDom {
    pub fn parse(html: &str) -> Result<Self> {
        let parsed = Html::parse_document(html);
        let options = OptionSelectors {
            any: Selector::parse("option").map_err(|_| anyhow!("failed to parse option selector"))?,
            selected: Selector::parse("option[selected]")
                .map_err(|_| anyhow!("failed to parse selected option selector"))?,
        };

        let mut dom = Self::default();
        dom.push_subtree(parsed.root_element(), None, &options);
        Ok(dom)
    }

    fn push_subtree(
        &mut self,
        el: ElementRef<'_>,
        parent: Option<NodeId>,
        options: &OptionSelectors,
    ) {
        let node = NodeId(self.elements.len());
        self.elements.push(read_element(el, parent, options));
        for child in el.children().filter_map(ElementRef::wrap) {
            self.push_subtree(child, Some(node), options);
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.elements.get(node.0)
    }

    pub fn items(&self, node: NodeId) -> Vec<String> {
        self.element(node)
            .map(|el| el.items.clone())
            .unwrap_or_default()
    }

    /// Every element keyed by a readable label, for printing and comparing views.
    pub fn snapshot(&self) -> BTreeMap<String, &Element> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, el)| (describe(i, el), el))
            .collect()
    }

    fn nodes_below(&self, within: Option<NodeId>) -> impl Iterator<Item = (NodeId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, el)| (NodeId(i), el))
            .filter(move |(node, _)| match within {
                Some(root) => *node != root && self.contains(root, *node),
                None => true,
            })
    }

    fn with_element(&mut self, node: NodeId, f: impl FnOnce(&mut Element)) {
        if let Some(el) = self.elements.get_mut(node.0) {
            f(el);
        }
    }
}

impl Surface for HeadlessDom {
    fn body_attr(&self, name: &str) -> Option<String> {
        self.elements
            .iter()
            .find(|el| el.tag == "body")
            .and_then(|el| el.attrs.get(name).cloned())
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements
            .iter()
            .position(|el| el.attrs.get("id").map(String::as_str) == Some(id))
            .map(NodeId)
    }

    fn query_attr(&self, attr: &str, within: Option<NodeId>) -> Vec<NodeId> {
        self.nodes_below(within)
            .filter(|(_, el)| el.attrs.contains_key(attr))
            .map(|(node, _)| node)
            .collect()
    }

    fn query_tag(&self, tag: &str, within: Option<NodeId>) -> Vec<NodeId> {
        self.nodes_below(within)
            .filter(|(_, el)| el.tag.eq_ignore_ascii_case(tag))
            .map(|(node, _)| node)
            .collect()
    }

    fn query_class(&self, class: &str, within: Option<NodeId>) -> Vec<NodeId> {
        self.nodes_below(within)
            .filter(|(_, el)| el.classes.contains(class))
            .map(|(node, _)| node)
            .collect()
    }

    fn tag(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.tag.clone())
            .unwrap_or_default()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)
            .and_then(|el| el.attrs.get(name).cloned())
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.element(current).and_then(|el| el.parent);
        }
        false
    }

    fn value(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.value.clone())
            .unwrap_or_default()
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        self.with_element(node, |el| el.value = value.to_string());
    }

    fn checked(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|el| el.checked)
    }

    fn set_checked(&mut self, node: NodeId, checked: bool) {
        self.with_element(node, |el| el.checked = checked);
    }

    fn text(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.text.clone())
            .unwrap_or_default()
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.with_element(node, |el| el.text = text.to_string());
    }

    fn set_list(&mut self, node: NodeId, items: &[String]) {
        self.with_element(node, |el| el.items = items.to_vec());
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.element(node)
            .and_then(|el| el.style.get(property).cloned())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        self.with_element(node, |el| {
            el.style.insert(property.to_string(), value.to_string());
        });
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|el| el.classes.contains(class))
    }

    fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        self.with_element(node, |el| {
            if on {
                el.classes.insert(class.to_string());
            } else {
                el.classes.remove(class);
            }
        });
    }
}

struct OptionSelectors {
    any: Selector,
    selected: Selector,
}

fn read_element(el: ElementRef<'_>, parent: Option<NodeId>, options: &OptionSelectors) -> Element {
    let tag = el.value().name().to_ascii_lowercase();
    let attrs: BTreeMap<String, String> = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let value = match tag.as_str() {
        "textarea" => el.text().collect::<String>(),
        "select" => el
            .select(&options.selected)
            .next()
            .or_else(|| el.select(&options.any).next())
            .map(option_value)
            .unwrap_or_default(),
        _ => attrs.get("value").cloned().unwrap_or_default(),
    };
    let classes: BTreeSet<String> = el.value().classes().map(ToString::to_string).collect();

    Element {
        checked: attrs.contains_key("checked"),
        text: collapse_text(el),
        tag,
        attrs,
        parent,
        value,
        classes,
        style: BTreeMap::new(),
        items: Vec::new(),
    }
}

fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn option_value(option: ElementRef<'_>) -> String {
    option
        .value()
        .attr("value")
        .map(ToString::to_string)
        .unwrap_or_else(|| collapse_text(option))
}

fn describe(index: usize, el: &Element) -> String {
    let mut label = format!("{index:04} {}", el.tag);
    if let Some(id) = el.attrs.get("id") {
        label.push_str(&format!("#{id}"));
    }
    for (name, value) in &el.attrs {
        if name.starts_with("data-") {
            label.push_str(&format!("[{name}={value}]"));
        }
    }
    label
}
