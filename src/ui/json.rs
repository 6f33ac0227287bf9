// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::types::ServerReport;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    servers: &'a [ServerReport],
}

/// Pretty-printed JSON report stamped with the current time.
pub fn render_json<W: Write>(out: &mut W, report: &[ServerReport]) -> Result<()> {
    render_json_at(out, report, Utc::now())
}

pub fn render_json_at<W: Write>(
    out: &mut W,
    report: &[ServerReport],
    generated_at: DateTime<Utc>,
) -> Result<()> {
    let document = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        servers: report,
    };
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    Ok(())
}
