use serde::{Deserialize, Serialize};

/// Audio mute state reported by the browser for a tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MutedInfo {
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_id: Option<String>,
}

/// A live tab as handed over by the browser's window/tab event source.
///
/// Most fields are optional because the browser omits them for tabs it is
/// still loading or that the extension has no host permission for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub id: i64,
    pub index: i64,
    pub window_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub muted_info: Option<MutedInfo>,
    /// `-1` when the tab is not in a group.
    #[serde(default = "no_group")]
    pub group_id: i64,
}

impl Default for BrowserTab {
    fn default() -> Self {
        Self {
            id: 0,
            index: 0,
            window_id: 0,
            title: None,
            url: None,
            fav_icon_url: None,
            pinned: false,
            active: false,
            muted_info: None,
            group_id: TAB_GROUP_ID_NONE,
        }
    }
}

/// A live tab group as handed over by the browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTabGroup {
    pub id: i64,
    pub window_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub collapsed: bool,
}

/// Group id the browser uses for ungrouped tabs.
pub const TAB_GROUP_ID_NONE: i64 = -1;

fn no_group() -> i64 {
    TAB_GROUP_ID_NONE
}

/// Snapshot of a tab with just the fields needed to recreate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TabStub {
    pub id: i64,
    pub index: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub fav_icon_url: String,
    #[serde(default)]
    pub pinned: bool,
    pub window_id: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted_info: Option<MutedInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
}

impl TabStub {
    /// Extracts a stub from a live tab. Ungrouped tabs get no `group_id`.
    pub fn from_tab(tab: &BrowserTab) -> Self {
        Self {
            id: tab.id,
            index: tab.index,
            title: tab.title.clone().unwrap_or_default(),
            url: tab.url.clone().unwrap_or_default(),
            fav_icon_url: tab.fav_icon_url.clone().unwrap_or_default(),
            pinned: tab.pinned,
            window_id: tab.window_id,
            active: tab.active,
            muted_info: tab.muted_info.clone(),
            group_id: (tab.group_id != TAB_GROUP_ID_NONE).then_some(tab.group_id),
        }
    }

    /// Tabs without a URL cannot be reopened and are never tracked.
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Snapshot of a tab group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupStub {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub collapsed: bool,
    pub window_id: i64,
}

impl TabGroupStub {
    pub fn from_tab_group(group: &BrowserTabGroup) -> Self {
        Self {
            id: group.id,
            title: group.title.clone().unwrap_or_default(),
            color: group.color.clone(),
            collapsed: group.collapsed,
            window_id: group.window_id,
        }
    }
}
