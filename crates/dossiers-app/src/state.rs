// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Page, Trigger};

/// The whole navigation table. `None` means the page does not offer the
/// trigger and the state stays put.
pub const fn transition(page: Page, trigger: Trigger) -> Option<Page> {
    match (page, trigger) {
        (Page::Home, Trigger::OpenAudit) => Some(Page::MissionAudit),
        (Page::Home, Trigger::OpenInspection) => Some(Page::MissionInspection),
        (Page::Home, Trigger::OpenStudy) => Some(Page::MissionStudy),
        (
            Page::MissionAudit | Page::MissionInspection | Page::MissionStudy,
            Trigger::ReturnHome,
        ) => Some(Page::Home),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub page: Page,
    pub status_line: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            page: Page::Home,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Trigger(Trigger),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    PageChanged(Page),
    TriggerIgnored(Trigger),
    StatusUpdated(String),
    StatusCleared,
}

impl Session {
    /// Rebuilds a session from the host's key-value slot. An empty slot is a
    /// fresh session.
    pub fn restore(slot: Option<&str>) -> Self {
        Self {
            page: slot.map_or(Page::Home, Page::from_session_value),
            status_line: None,
        }
    }

    pub fn session_value(&self) -> &'static str {
        self.page.session_value()
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Trigger(trigger) => self.fire(trigger),
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn fire(&mut self, trigger: Trigger) -> Vec<AppEvent> {
        let Some(next) = transition(self.page, trigger) else {
            tracing::debug!(page = ?self.page, ?trigger, "trigger not offered by page");
            return vec![
                AppEvent::TriggerIgnored(trigger),
                self.set_status("action unavailable"),
            ];
        };

        tracing::debug!(from = ?self.page, to = ?next, ?trigger, "page transition");
        self.page = next;
        self.status_line = None;
        vec![AppEvent::PageChanged(next)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
