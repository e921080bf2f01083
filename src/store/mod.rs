// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence of flow documents as a folder of files.
//!
//! The store module splits a flow document into the slimmed main document, one sidecar per
//! offloaded property and a coordinate sidecar, and reassembles it on load.

pub mod flow_folder;
pub mod staging;
pub mod write_queue;

pub use flow_folder::{
    EncodedFlows, FlowFolder, StoreError, WriteDurability, COORDINATES_FILENAME,
    DECODE_BATCH_SIZE, FLOWS_SUFFIX,
};
pub use staging::StagingReport;
pub use write_queue::{WritePermit, WriteQueue};
