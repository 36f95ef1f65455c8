// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt::Debug;

use ota_proto::{image::AppDescriptor, Source};

/// [`Driver`] trait provides partition and anti-rollback support for [`Ota`][super::Ota] instances
pub trait Driver {
    /// Partition reference
    type Partition: Copy + PartialEq + Debug;

    /// Open partition write handle
    type Handle;

    /// Platform error type
    type Error: Debug;

    /// Fetch the currently running partition
    fn running_partition(&self) -> Self::Partition;

    /// Read the application descriptor of an installed partition
    fn partition_description(&self, p: Self::Partition) -> Result<AppDescriptor, Self::Error>;

    /// Select the next update partition, if any
    fn next_update_partition(&self) -> Option<Self::Partition>;

    /// Fetch the burned anti-rollback counter
    fn secure_version(&self) -> u32;

    /// Start writing an image of `image_size` bytes to a partition
    fn begin(&mut self, p: Self::Partition, image_size: usize) -> Result<Self::Handle, Self::Error>;

    /// Append data at the current write offset
    fn write(&mut self, h: &mut Self::Handle, data: &[u8]) -> Result<(), Self::Error>;

    /// Finalize a partition write, checking image integrity
    fn end(&mut self, h: Self::Handle) -> Result<(), Self::Error>;

    /// Discard a partition write
    fn abort(&mut self, h: Self::Handle);

    /// Switch the boot partition
    fn set_boot_partition(&mut self, p: Self::Partition) -> Result<(), Self::Error>;

    /// Restart the device
    fn restart(&mut self);
}

impl<T: Driver> Driver for &mut T {
    type Partition = T::Partition;
    type Handle = T::Handle;
    type Error = T::Error;

    fn running_partition(&self) -> Self::Partition {
        T::running_partition(self)
    }

    fn partition_description(&self, p: Self::Partition) -> Result<AppDescriptor, Self::Error> {
        T::partition_description(self, p)
    }

    fn next_update_partition(&self) -> Option<Self::Partition> {
        T::next_update_partition(self)
    }

    fn secure_version(&self) -> u32 {
        T::secure_version(self)
    }

    fn begin(&mut self, p: Self::Partition, image_size: usize) -> Result<Self::Handle, Self::Error> {
        T::begin(self, p, image_size)
    }

    fn write(&mut self, h: &mut Self::Handle, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, h, data)
    }

    fn end(&mut self, h: Self::Handle) -> Result<(), Self::Error> {
        T::end(self, h)
    }

    fn abort(&mut self, h: Self::Handle) {
        T::abort(self, h)
    }

    fn set_boot_partition(&mut self, p: Self::Partition) -> Result<(), Self::Error> {
        T::set_boot_partition(self, p)
    }

    fn restart(&mut self) {
        T::restart(self)
    }
}

/// [`Channel`] trait provides raw frame exchange with the host
pub trait Channel {
    type Error: Debug;

    /// Block until the next raw frame (source tag and CBOR body) is received,
    /// returning the frame length
    fn recv(&mut self, buff: &mut [u8]) -> Result<usize, Self::Error>;

    /// Send an encoded reply to the provided source
    fn send(&mut self, source: Source, data: &[u8]) -> Result<(), Self::Error>;
}

impl<T: Channel> Channel for &mut T {
    type Error = T::Error;

    fn recv(&mut self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        T::recv(self, buff)
    }

    fn send(&mut self, source: Source, data: &[u8]) -> Result<(), Self::Error> {
        T::send(self, source, data)
    }
}

/// [`Ui`] trait provides screens, button events and delays
pub trait Ui {
    /// Show an activity message
    fn message(&mut self, text: &str);

    /// Show current and new firmware versions for confirmation
    fn show_versions(&mut self, current: &str, new: &str);

    /// Block until a button is pressed, returning true on accept
    fn wait_button(&mut self) -> bool;

    /// Show a progress bar
    fn progress_start(&mut self, title: &str, label: &str);

    /// Update the progress bar
    fn progress(&mut self, total: usize, current: usize);

    /// Show an error and block until acknowledged
    fn await_error(&mut self, status: &str);

    fn delay_ms(&mut self, ms: u32);
}

impl<T: Ui + ?Sized> Ui for &mut T {
    fn message(&mut self, text: &str) {
        T::message(self, text)
    }

    fn show_versions(&mut self, current: &str, new: &str) {
        T::show_versions(self, current, new)
    }

    fn wait_button(&mut self) -> bool {
        T::wait_button(self)
    }

    fn progress_start(&mut self, title: &str, label: &str) {
        T::progress_start(self, title, label)
    }

    fn progress(&mut self, total: usize, current: usize) {
        T::progress(self, total, current)
    }

    fn await_error(&mut self, status: &str) {
        T::await_error(self, status)
    }

    fn delay_ms(&mut self, ms: u32) {
        T::delay_ms(self, ms)
    }
}
