// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Headless UI recording screens

use std::{collections::VecDeque, time::Duration};

use log::{debug, info, warn};
use serde::Serialize;

use ota_core::engine::Ui;

/// Screens shown by the simulated device
#[derive(Clone, PartialEq, Debug, Serialize)]
pub enum Screen {
    Message(String),
    Versions { current: String, new: String },
    Progress { title: String, label: String },
    Error(String),
}

/// Simulated UI with scripted button presses
#[derive(Clone, Debug)]
pub struct SimUi {
    /// Button responses, consumed in order
    buttons: VecDeque<bool>,
    /// Response once the script is exhausted
    default_button: bool,
    /// Sleep on delays rather than recording them
    realtime: bool,

    screens: Vec<Screen>,
    progress: (usize, usize),
    delayed_ms: u64,
}

impl SimUi {
    /// Create a UI that answers every confirmation with `accept`
    pub fn new(accept: bool) -> Self {
        Self {
            buttons: VecDeque::new(),
            default_button: accept,
            realtime: false,
            screens: vec![],
            progress: (0, 0),
            delayed_ms: 0,
        }
    }

    /// Queue button responses ahead of the default
    pub fn with_buttons(mut self, buttons: impl IntoIterator<Item = bool>) -> Self {
        self.buttons.extend(buttons);
        self
    }

    /// Actually sleep on UI delays
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Last `(total, current)` progress update
    pub fn last_progress(&self) -> (usize, usize) {
        self.progress
    }

    /// Total requested delay in milliseconds
    pub fn delayed_ms(&self) -> u64 {
        self.delayed_ms
    }

    /// Most recent error screen
    pub fn last_error(&self) -> Option<&str> {
        self.screens.iter().rev().find_map(|s| match s {
            Screen::Error(e) => Some(e.as_str()),
            _ => None,
        })
    }
}

impl Ui for SimUi {
    fn message(&mut self, text: &str) {
        info!("[screen] {}", text);
        self.screens.push(Screen::Message(text.to_string()));
    }

    fn show_versions(&mut self, current: &str, new: &str) {
        info!("[screen] Current: {}, New: {}", current, new);
        self.screens.push(Screen::Versions {
            current: current.to_string(),
            new: new.to_string(),
        });
    }

    fn wait_button(&mut self) -> bool {
        let b = self.buttons.pop_front().unwrap_or(self.default_button);
        info!("[button] {}", if b { "accept" } else { "decline" });
        b
    }

    fn progress_start(&mut self, title: &str, label: &str) {
        self.progress = (0, 0);
        self.screens.push(Screen::Progress {
            title: title.to_string(),
            label: label.to_string(),
        });
    }

    fn progress(&mut self, total: usize, current: usize) {
        debug!("[progress] {}/{}", current, total);
        self.progress = (total, current);
    }

    fn await_error(&mut self, status: &str) {
        warn!("[screen] Error: {}", status);
        self.screens.push(Screen::Error(status.to_string()));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delayed_ms += ms as u64;

        if self.realtime {
            std::thread::sleep(Duration::from_millis(ms as u64));
        }
    }
}
