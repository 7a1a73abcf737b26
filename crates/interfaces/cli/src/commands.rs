use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;

use plantcare_core::{Owner, Plant, PlantCareState};
use plantcare_runtime::SweepReport;
use plantcare_scheduler::CarePolicy;
use plantcare_store::{Query, Store};

/// Who is acting.  The username defaults to the part of the email before `@`.
#[derive(Debug, Clone, Args)]
pub struct Identity {
    #[arg(long = "as", value_name = "EMAIL")]
    pub email: String,
    #[arg(long)]
    pub username: Option<String>,
}

impl Identity {
    pub fn owner(&self) -> Owner {
        let username = self.username.clone().unwrap_or_else(|| {
            self.email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });
        Owner::new(self.email.clone(), username)
    }
}

/// Care fields settable from the command line.  Unset flags leave the field
/// as it is.
#[derive(Debug, Clone, Default, Args)]
pub struct CareArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub public: Option<bool>,
    #[arg(long)]
    pub notify: Option<bool>,
    #[arg(long)]
    pub skipped_last_fertilize: Option<bool>,
    /// Days between waterings.
    #[arg(long)]
    pub water_every: Option<u32>,
    /// Days between fertilizings; 0 turns fertilizer reminders off.
    #[arg(long)]
    pub fertilize_every: Option<u32>,
    /// Last watering, `MM/DD/YYYY`.
    #[arg(long, value_name = "MM/DD/YYYY")]
    pub watered: Option<String>,
    /// Last fertilizing, `MM/DD/YYYY`.
    #[arg(long, value_name = "MM/DD/YYYY")]
    pub fertilized: Option<String>,
    /// Date the soil was last found still moist, `MM/DD/YYYY`.
    #[arg(long, value_name = "MM/DD/YYYY")]
    pub moist: Option<String>,
}

impl CareArgs {
    pub fn into_state(self) -> PlantCareState {
        let mut state = PlantCareState::default();
        self.apply_to(&mut state);
        state
    }

    pub fn apply_to(self, state: &mut PlantCareState) {
        if let Some(name) = self.name {
            state.name = name;
        }
        if let Some(tag) = self.tag {
            state.tag = tag;
        }
        if let Some(notes) = self.notes {
            state.notes = notes;
        }
        if let Some(public) = self.public {
            state.is_public = public;
        }
        if let Some(notify) = self.notify {
            state.do_notify = notify;
        }
        if let Some(skipped) = self.skipped_last_fertilize {
            state.skipped_last_fertilize = skipped;
        }
        if let Some(days) = self.water_every {
            state.watering_interval_days = days;
        }
        if let Some(days) = self.fertilize_every {
            state.fertilizing_interval_days = days;
        }
        if let Some(date) = self.watered {
            state.last_water_date = date;
        }
        if let Some(date) = self.fertilized {
            state.last_fertilize_date = date;
        }
        if let Some(date) = self.moist {
            state.last_moist_date = date;
        }
    }
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

fn render_json(value: &impl serde::Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn print_plant_table(plants: &[Plant]) {
    println!("── plants ───────────────────────────────────────────");
    for plant in plants {
        println!(
            "  {:>5}  {:<24} {:<16} {}{}",
            plant.id,
            plant.care.name,
            plant.owner.username,
            if plant.care.is_public { "public" } else { "private" },
            if plant.care.do_notify { ", reminders on" } else { "" },
        );
    }
    println!("  ({} plants)", plants.len());
}

pub fn print_report(report: &SweepReport) {
    println!("── sweep ────────────────────────────────────────────");
    println!("  evaluated      : {}", report.evaluated);
    println!("  reminded       : {}", report.reminded);
    println!("  send failures  : {}", report.send_failures);
    println!("  dates migrated : {}", report.migrated);
    println!("  write failures : {}", report.write_failures);
}

/// Print every plant that would get a reminder at `now`; returns how many.
pub async fn run_check<S: Store>(
    store: &S,
    policy: &CarePolicy,
    now: DateTime<Utc>,
) -> Result<usize> {
    let plants: Vec<Plant> = store.find(Query::all()).await?;
    let mut due = 0;
    for plant in &plants {
        let needs = policy.evaluate(&plant.care, now);
        if !needs.any() {
            continue;
        }
        due += 1;
        let mut what = Vec::new();
        if needs.needs_fertilize {
            what.push("fertilize");
        }
        if needs.needs_water {
            what.push("water");
        }
        println!(
            "  {:>5}  {:<24} {:<28} {}",
            plant.id,
            plant.care.name,
            plant.owner.email,
            what.join(" + ")
        );
    }
    println!("  ({due} of {} plants due)", plants.len());
    Ok(due)
}
