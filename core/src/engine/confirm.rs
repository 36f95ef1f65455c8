// Copyright (c) 2022-2023 The MobileCoin Foundation

use alloc::boxed::Box;

use super::Ui;

/// Firmware update confirmation policy, selected when an
/// [Ota][super::Ota] instance is configured
pub trait Confirm {
    /// Present both versions and return whether the update was accepted
    fn confirm(&mut self, ui: &mut dyn Ui, current: &str, new: &str) -> bool;
}

impl<C: Confirm + ?Sized> Confirm for Box<C> {
    fn confirm(&mut self, ui: &mut dyn Ui, current: &str, new: &str) -> bool {
        C::confirm(self, ui, current, new)
    }
}

/// Wait for the user to accept or decline
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Interactive;

impl Confirm for Interactive {
    fn confirm(&mut self, ui: &mut dyn Ui, current: &str, new: &str) -> bool {
        ui.show_versions(current, new);
        ui.wait_button()
    }
}

/// Accept after a fixed delay, for unattended testing
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Unattended {
    pub delay_ms: u32,
}

impl Unattended {
    pub const fn new(delay_ms: u32) -> Self {
        Self { delay_ms }
    }
}

impl Confirm for Unattended {
    fn confirm(&mut self, ui: &mut dyn Ui, current: &str, new: &str) -> bool {
        ui.show_versions(current, new);
        ui.delay_ms(self.delay_ms);
        true
    }
}
