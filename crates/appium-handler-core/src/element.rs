//! Element and locator types shared by every driver backend.
//!
//! Elements are opaque server-side references: the handler never holds a DOM
//! or accessibility tree locally, it only remembers the id the Appium server
//! assigned and asks the server about it (displayed state, rect) on demand.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to an element living in the remote session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// The server-assigned element id.
    pub id: String,
}

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The rect (position and dimensions) of an element.
///
/// Coordinates are in device points, with the origin at the top-left corner
/// of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    /// The x-coordinate of the element's top-left corner.
    pub x: f64,
    /// The y-coordinate of the element's top-left corner.
    pub y: f64,
    /// The width of the element in points.
    pub width: f64,
    /// The height of the element in points.
    pub height: f64,
}

impl ElementRect {
    /// Geometric center of the rect, truncated to whole points.
    pub fn center(&self) -> (i32, i32) {
        (
            (self.x + self.width / 2.0) as i32,
            (self.y + self.height / 2.0) as i32,
        )
    }
}

/// How an element is located on the server.
///
/// Each variant maps onto a WebDriver / Appium location strategy; the string
/// payload is the strategy's query value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Name(String),
    ClassName(String),
    TagName(String),
    XPath(String),
    CssSelector(String),
    LinkText(String),
    PartialLinkText(String),
    AccessibilityId(String),
    /// Android only: a `UiSelector` expression.
    AndroidUiAutomator(String),
    /// iOS only: an `NSPredicate` string.
    IosPredicate(String),
    /// iOS only: a class chain query.
    IosClassChain(String),
}

impl Locator {
    /// The wire name of the location strategy (`using`).
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::Name(_) => "name",
            Locator::ClassName(_) => "class name",
            Locator::TagName(_) => "tag name",
            Locator::XPath(_) => "xpath",
            Locator::CssSelector(_) => "css selector",
            Locator::LinkText(_) => "link text",
            Locator::PartialLinkText(_) => "partial link text",
            Locator::AccessibilityId(_) => "accessibility id",
            Locator::AndroidUiAutomator(_) => "-android uiautomator",
            Locator::IosPredicate(_) => "-ios predicate string",
            Locator::IosClassChain(_) => "-ios class chain",
        }
    }

    /// The query value (`value`).
    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v)
            | Locator::Name(v)
            | Locator::ClassName(v)
            | Locator::TagName(v)
            | Locator::XPath(v)
            | Locator::CssSelector(v)
            | Locator::LinkText(v)
            | Locator::PartialLinkText(v)
            | Locator::AccessibilityId(v)
            | Locator::AndroidUiAutomator(v)
            | Locator::IosPredicate(v)
            | Locator::IosClassChain(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "By.{}: {}", self.strategy(), self.value())
    }
}
