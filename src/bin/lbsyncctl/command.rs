use std::future::Future;

use serde::Serialize;
use serde_json::json;

use lb_sync::dto::status::PassReportDto;
use lb_sync::model::entry::{DesiredEntrySet, RoutingEntrySpec};

use crate::args::OutFormat;

pub async fn execute_command<Cmd, FutRes, Res>(out_format: OutFormat, command: Cmd) -> bool
where
    Cmd: FnOnce() -> FutRes,
    FutRes: Future<Output = anyhow::Result<Res>>,
    Res: Printable,
{
    match (command().await, out_format) {
        (Ok(result), fmt) => {
            result.print(fmt);
            true
        }
        (Err(error), OutFormat::Plain) => {
            eprintln!("Error during command execution - {error:#}");
            false
        }
        (Err(error), OutFormat::Json) => {
            eprintln!("{}", json!({ "out": "error", "message": format!("{error:#}") }));
            false
        }
    }
}

pub trait Printable {
    fn print(&self, format: OutFormat);
}

impl<T> Printable for T
where
    T: PrintFormat<JsonFormat> + PrintFormat<PlainFormat>,
{
    fn print(&self, format: OutFormat) {
        match format {
            OutFormat::Plain => PrintFormat::<PlainFormat>::print(self),
            OutFormat::Json => PrintFormat::<JsonFormat>::print(self),
        }
    }
}

pub struct JsonFormat;
pub struct PlainFormat;
pub trait PrintFormat<F> {
    fn print(&self);
}

impl<S> PrintFormat<JsonFormat> for S
where
    S: Serialize,
{
    fn print(&self) {
        match serde_json::to_string(self) {
            Ok(serialized) => println!("{serialized}"),
            Err(err) => eprintln!("Error serializing result in json format - {err}"),
        }
    }
}

fn print_links(links: &[RoutingEntrySpec]) {
    println!("{0: <16} | {1: <48}", "SERVICE", "PORT");
    for link in links {
        for port in &link.ports {
            println!("{0: <16} | {1: <48}", link.service_id, port);
        }
    }
}

impl PrintFormat<PlainFormat> for DesiredEntrySet {
    fn print(&self) {
        print_links(self.entries());
    }
}

impl PrintFormat<PlainFormat> for Vec<RoutingEntrySpec> {
    fn print(&self) {
        print_links(self);
    }
}

impl PrintFormat<PlainFormat> for PassReportDto {
    fn print(&self) {
        println!(
            "{0: <10} | {1: <28} | {2: <8} | {3: <8} | {4: <10}",
            "OUTCOME", "CODE", "ENTRIES", "SKIPPED", "ELAPSED"
        );
        println!(
            "{0: <10} | {1: <28} | {2: <8} | {3: <8} | {4: <10}",
            self.outcome.as_str(),
            self.code.as_deref().unwrap_or("NONE"),
            self.entries,
            self.skipped_services,
            format!("{}ms", self.elapsed_ms),
        );
        if let Some(message) = &self.message {
            println!("{message}");
        }
    }
}
