use std::io::{self, IsTerminal};

use crate::app::{ImportSummary, SyncOutcome};
use crate::record::{local_display_time, VisitRecord};
use crate::sync::{Connectivity, SyncStatus};

pub fn print_visit_list(visits: &[VisitRecord], total: usize) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Visits"));
    for line in visit_list_lines(visits, total, &palette) {
        println!("{line}");
    }
}

fn visit_list_lines(visits: &[VisitRecord], total: usize, palette: &Palette) -> Vec<String> {
    if visits.is_empty() {
        let message = if total == 0 {
            "No saved visits yet."
        } else {
            "No matches."
        };
        return vec![palette.dim(message)];
    }

    let mut lines: Vec<String> = visits
        .iter()
        .map(|visit| format_visit_row(visit, palette))
        .collect();
    lines.push(palette.dim(&format!("{} of {} visit(s)", visits.len(), total)));
    lines
}

fn format_visit_row(visit: &VisitRecord, palette: &Palette) -> String {
    let name = if visit.customer_name.is_empty() {
        "Unnamed Customer"
    } else {
        &visit.customer_name
    };
    let mut line = format!("{} {}", palette.id(&short_id(&visit.id)), palette.bold(name));
    if !visit.location.is_empty() {
        line.push(' ');
        line.push_str(&palette.dim(&visit.location));
    }
    if !visit.date.is_empty() {
        line.push(' ');
        line.push_str(&palette.date(&visit.date));
    }
    line
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub fn print_worksheet(visit: &VisitRecord) {
    let palette = Palette::auto();
    for line in worksheet_lines(visit, &palette) {
        println!("{line}");
    }
}

struct WorksheetSection<'a> {
    title: &'static str,
    fields: Vec<(&'static str, &'a str)>,
}

fn worksheet_sections(visit: &VisitRecord) -> Vec<WorksheetSection<'_>> {
    vec![
        WorksheetSection {
            title: "Customer",
            fields: vec![("Contact", visit.contact.as_str())],
        },
        WorksheetSection {
            title: "Operations",
            fields: vec![
                ("Machines / Lines", visit.machines.as_str()),
                ("Product Produced", visit.product.as_str()),
                ("Current Tooling", visit.tooling.as_str()),
            ],
        },
        WorksheetSection {
            title: "Performance",
            fields: vec![
                ("Blade Change Interval", visit.blade_change_interval.as_str()),
                ("Grind Interval", visit.grind_interval.as_str()),
                ("Known Issues", visit.issues.as_str()),
            ],
        },
        WorksheetSection {
            title: "Opportunity Areas",
            fields: vec![
                ("Slitter Knives", visit.slitter_tooling.as_str()),
                ("Cutoff Knives", visit.cutoff_tooling.as_str()),
                ("Perf Knives", visit.perf_tooling.as_str()),
                ("Grinding Systems", visit.grinding_systems.as_str()),
            ],
        },
        WorksheetSection {
            title: "Sales Plan",
            fields: vec![
                ("Visit Goal", visit.goal.as_str()),
                ("Next Step", visit.next_step.as_str()),
            ],
        },
    ]
}

fn worksheet_lines(visit: &VisitRecord, palette: &Palette) -> Vec<String> {
    let mut lines = vec![
        palette.heading("Visit Worksheet"),
        palette.dim(&format!(
            "{} / {} / {}",
            visit.customer_name, visit.location, visit.date
        )),
        palette.dim(&format!("id: {}", visit.id)),
    ];

    for section in worksheet_sections(visit) {
        lines.push(String::new());
        lines.push(palette.section(section.title));
        for (label, value) in section.fields {
            let mut values = value.lines();
            let first = values.next().unwrap_or("");
            lines.push(format!("  {}: {}", palette.bold(label), first));
            for rest in values {
                lines.push(format!("    {rest}"));
            }
        }
    }
    lines
}

pub fn print_saved(visit: &VisitRecord) {
    let palette = Palette::auto();
    println!(
        "Saved: {} {}",
        visit.display_name(),
        palette.id(&format!("({})", visit.id))
    );
}

pub fn print_import_summary(summary: &ImportSummary) {
    println!("imported={} skipped={}", summary.imported, summary.skipped);
}

pub fn print_sync_outcome(outcome: &SyncOutcome) {
    let palette = Palette::auto();
    let message = match outcome.status {
        SyncStatus::Created | SyncStatus::Updated => palette.ok(&outcome.message),
        SyncStatus::Offline => palette.warn(&outcome.message),
        _ => outcome.message.clone(),
    };
    println!("{message}");
}

/// `last_sync` is the stored UTC stamp; it is shown in local time.
pub fn print_status(connectivity: Connectivity, last_sync: Option<&str>) {
    let palette = Palette::auto();
    let shown = last_sync.map(local_display_time);
    for line in status_lines(connectivity, shown.as_deref(), &palette) {
        println!("{line}");
    }
}

fn status_lines(
    connectivity: Connectivity,
    last_sync: Option<&str>,
    palette: &Palette,
) -> Vec<String> {
    let banner = match connectivity {
        Connectivity::Online => palette.ok(connectivity.banner()),
        Connectivity::Offline => palette.warn(connectivity.banner()),
    };
    let sync_line = match last_sync {
        Some(at) => format!("Last Drive sync: {}", palette.date(at)),
        None => palette.dim("No Drive sync yet."),
    };
    vec![banner, sync_line]
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn section(&self, text: &str) -> String {
        self.paint("1;35", text)
    }

    fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn date(&self, text: &str) -> String {
        self.paint("33", text)
    }

    fn ok(&self, text: &str) -> String {
        self.paint("32", text)
    }

    fn warn(&self, text: &str) -> String {
        self.paint("31", text)
    }
}
