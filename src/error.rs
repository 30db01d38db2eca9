//! Error kinds for bring-up and the frame loop

use ash::vk;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a presentable swapchain stopped matching its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    OutOfDate,
    Suboptimal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("windowing setup failed: {0}")]
    EnvironmentInit(String),

    #[error("{kind} `{name}` is not available on this host")]
    CapabilityUnavailable { kind: &'static str, name: String },

    #[error("failed to create {what}: {result}")]
    ResourceCreation { what: &'static str, result: vk::Result },

    #[error("no suitable GPU found among {0} candidates")]
    NoSuitableDevice(usize),

    #[error("no queue family supports {0}")]
    NoSuitableQueueFamily(&'static str),

    #[error("shader binary {path:?} could not be read: {source}")]
    ShaderAssetMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("swapchain is {0:?} and has to be rebuilt")]
    TransientPresentation(PresentationState),

    #[error("in-flight fence did not signal within {0:?}")]
    FenceTimeout(Duration),

    #[error("{what} failed: {result}")]
    Driver { what: &'static str, result: vk::Result },

    #[error("{0} is not available before bring-up creates it")]
    NotInitialized(&'static str),
}

impl Error {
    pub fn creation(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Error::ResourceCreation { what, result }
    }

    pub fn driver(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| match result {
            vk::Result::ERROR_OUT_OF_DATE_KHR => {
                Error::TransientPresentation(PresentationState::OutOfDate)
            }
            vk::Result::SUBOPTIMAL_KHR => {
                Error::TransientPresentation(PresentationState::Suboptimal)
            }
            result => Error::Driver { what, result },
        }
    }

    /// True when rebuilding the swapchain is enough to continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::TransientPresentation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
