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

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use crate::types::{GpuUsage, Occupant, ServerReport};

/// Plain-text report, one block per server.
pub struct TextRenderer {
    /// Show every GPU with its users instead of only the free ones.
    pub list_all: bool,
    /// Emit terminal color sequences.
    pub color: bool,
}

impl TextRenderer {
    pub fn new(list_all: bool, color: bool) -> Self {
        Self { list_all, color }
    }

    pub fn render<W: Write>(&self, out: &mut W, report: &[ServerReport]) -> io::Result<()> {
        for server in report {
            self.render_server(out, server)?;
        }
        out.flush()
    }

    fn render_server<W: Write>(&self, out: &mut W, server: &ServerReport) -> io::Result<()> {
        let address = server.target.ssh_destination();
        let gpus = match &server.result {
            Ok(gpus) => gpus,
            Err(failure) => {
                self.print(out, &format!("Server {address}: "), None)?;
                self.print(out, &failure.to_string(), Some(Color::Red))?;
                return self.print(out, "\n", None);
            }
        };

        if self.list_all {
            self.print(out, &format!("Server {address}:\n"), None)?;
            for gpu in gpus {
                self.render_usage(out, gpu)?;
            }
            return Ok(());
        }

        let free: Vec<&GpuUsage> = gpus.iter().filter(|gpu| gpu.is_free()).collect();
        if free.is_empty() {
            self.print(out, &format!("Server {address}: "), None)?;
            return self.print(out, "No free GPUs :(\n", Some(Color::Yellow));
        }

        self.print(out, &format!("Server {address}:\n"), None)?;
        for gpu in free {
            self.print(out, &format!("\tGPU {}, ", gpu.device.index), None)?;
            self.print(out, &gpu.device.model, Some(Color::Green))?;
            self.print(out, "\n", None)?;
        }
        Ok(())
    }

    fn render_usage<W: Write>(&self, out: &mut W, gpu: &GpuUsage) -> io::Result<()> {
        self.print(
            out,
            &format!("\tGPU {} ({}): ", gpu.device.index, gpu.device.model),
            None,
        )?;
        if gpu.is_free() {
            self.print(out, "Free", Some(Color::Green))?;
        } else {
            let users = gpu
                .distinct_users()
                .into_iter()
                .map(format_occupant)
                .collect::<Vec<_>>()
                .join(", ");
            self.print(out, &format!("Used by {users}"), Some(Color::Yellow))?;
        }
        self.print(out, "\n", None)
    }

    fn print<W: Write>(&self, out: &mut W, text: &str, color: Option<Color>) -> io::Result<()> {
        match color {
            Some(color) if self.color => queue!(
                out,
                SetForegroundColor(color),
                Print(text),
                ResetColor
            ),
            _ => queue!(out, Print(text)),
        }
    }
}

fn format_occupant(occupant: &Occupant) -> String {
    match &occupant.display_name {
        Some(name) => format!("{} ({name})", occupant.username),
        None => occupant.username.clone(),
    }
}
