use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{
    Gender, Household, HouseholdResult, Member, SimulationParameters, assemble_result,
    assign_roles, calibrate, household_surplus, validate_household,
};
use crate::data::ReferenceData;
use crate::error::{SimError, SimResult};
use crate::lookup::{BaselineLookup, build_lookup_request};

/// Outcome of one computation pass. Households absent from both maps were
/// incomplete when the pass started.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassOutcome {
    pub results: BTreeMap<u64, HouseholdResult>,
    pub errors: BTreeMap<u64, String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub parameters: SimulationParameters,
    pub gamma: f64,
    pub households: Vec<Household>,
    pub outcome: Option<PassOutcome>,
}

/// Partial parameter update; absent fields keep their current value.
#[derive(Copy, Clone, Debug, Default)]
pub struct ParameterUpdate {
    pub alpha: Option<f64>,
    pub child_weight: Option<f64>,
    pub elder_weight: Option<f64>,
    pub multi_person_weight: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub age: Option<String>,
    pub income: Option<String>,
    pub gender: Option<Gender>,
}

struct SessionState {
    params: SimulationParameters,
    gamma: f64,
    households: Vec<Household>,
    next_household_id: u64,
    outcome: Option<PassOutcome>,
    revision: u64,
}

/// Bumps the revision and drops the published outcome; results read as
/// pending until the next pass commits.
fn invalidate(state: &mut SessionState) {
    state.revision += 1;
    state.outcome = None;
}

struct Inner {
    reference: ReferenceData,
    lookup: Arc<dyn BaselineLookup>,
    debounce: Duration,
    state: Mutex<SessionState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Shared simulation session. Cloning is cheap and every clone works on the
/// same state.
#[derive(Clone)]
pub struct Simulator {
    inner: Arc<Inner>,
}

impl Simulator {
    pub fn new(
        reference: ReferenceData,
        lookup: Arc<dyn BaselineLookup>,
        debounce: Duration,
    ) -> Self {
        let params = SimulationParameters::default();
        let gamma = calibrate(&params, &reference.persons, &reference.totals);
        Self {
            inner: Arc::new(Inner {
                reference,
                lookup,
                debounce,
                state: Mutex::new(SessionState {
                    params,
                    gamma,
                    households: Vec::new(),
                    next_household_id: 0,
                    outcome: None,
                    revision: 0,
                }),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.inner.reference
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock().await;
        SessionSnapshot {
            parameters: state.params,
            gamma: state.gamma,
            households: state.households.clone(),
            outcome: state.outcome.clone(),
        }
    }

    pub async fn parameters(&self) -> (SimulationParameters, f64) {
        let state = self.inner.state.lock().await;
        (state.params, state.gamma)
    }

    pub async fn results(&self) -> (f64, Option<PassOutcome>) {
        let state = self.inner.state.lock().await;
        (state.gamma, state.outcome.clone())
    }

    /// Applies a partial parameter update and recalibrates gamma in the same
    /// critical section, so no reader ever sees one without the other.
    pub async fn update_parameters(&self, update: ParameterUpdate) -> (SimulationParameters, f64) {
        let applied = {
            let mut state = self.inner.state.lock().await;
            if let Some(alpha) = update.alpha {
                state.params.alpha = alpha;
            }
            if let Some(child) = update.child_weight {
                state.params.beta.child = child;
            }
            if let Some(elder) = update.elder_weight {
                state.params.beta.elder = elder;
            }
            if let Some(multi_person) = update.multi_person_weight {
                state.params.beta.multi_person = multi_person;
            }
            state.gamma = calibrate(
                &state.params,
                &self.inner.reference.persons,
                &self.inner.reference.totals,
            );
            invalidate(&mut state);
            (state.params, state.gamma)
        };
        self.schedule_pass().await;
        applied
    }

    /// Creates a household with one blank member. Household ids count up for
    /// the lifetime of the session and are never reused.
    pub async fn add_household(&self) -> Household {
        let household = {
            let mut state = self.inner.state.lock().await;
            state.next_household_id += 1;
            let id = state.next_household_id;
            let mut household = Household::new(id, format!("Household {id}"));
            household.add_member();
            state.households.push(household.clone());
            invalidate(&mut state);
            household
        };
        self.schedule_pass().await;
        household
    }

    pub async fn remove_household(&self, id: u64) -> SimResult<()> {
        {
            let mut state = self.inner.state.lock().await;
            let before = state.households.len();
            state.households.retain(|h| h.id != id);
            if state.households.len() == before {
                return Err(SimError::UnknownHousehold { id });
            }
            invalidate(&mut state);
        }
        self.schedule_pass().await;
        Ok(())
    }

    pub async fn add_member(&self, household_id: u64) -> SimResult<Member> {
        let member = {
            let mut state = self.inner.state.lock().await;
            let household = state
                .households
                .iter_mut()
                .find(|h| h.id == household_id)
                .ok_or(SimError::UnknownHousehold { id: household_id })?;
            let member = household.add_member();
            invalidate(&mut state);
            member
        };
        self.schedule_pass().await;
        Ok(member)
    }

    pub async fn update_member(
        &self,
        household_id: u64,
        member_id: u64,
        update: MemberUpdate,
    ) -> SimResult<Member> {
        let member = {
            let mut state = self.inner.state.lock().await;
            let household = state
                .households
                .iter_mut()
                .find(|h| h.id == household_id)
                .ok_or(SimError::UnknownHousehold { id: household_id })?;
            let member = household
                .member_mut(member_id)
                .ok_or(SimError::UnknownMember {
                    household: household_id,
                    member: member_id,
                })?;
            if let Some(name) = update.name {
                member.name = name;
            }
            if let Some(age) = update.age {
                member.age = age;
            }
            if let Some(income) = update.income {
                member.income = income;
            }
            if let Some(gender) = update.gender {
                member.gender = gender;
            }
            let member = member.clone();
            invalidate(&mut state);
            member
        };
        self.schedule_pass().await;
        Ok(member)
    }

    pub async fn remove_member(&self, household_id: u64, member_id: u64) -> SimResult<()> {
        {
            let mut state = self.inner.state.lock().await;
            let household = state
                .households
                .iter_mut()
                .find(|h| h.id == household_id)
                .ok_or(SimError::UnknownHousehold { id: household_id })?;
            if !household.remove_member(member_id) {
                return Err(SimError::UnknownMember {
                    household: household_id,
                    member: member_id,
                });
            }
            invalidate(&mut state);
        }
        self.schedule_pass().await;
        Ok(())
    }

    /// Cancels whatever pass is pending or in flight and starts the debounce
    /// window over, so a burst of edits produces exactly one computation.
    async fn schedule_pass(&self) {
        let mut pending = self.inner.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        let simulator = self.clone();
        let debounce = self.inner.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            simulator.run_pass().await;
        }));
    }

    /// One computation pass over a snapshot of the session. Commits only if
    /// no edit arrived while the pass was running.
    async fn run_pass(&self) {
        let (params, gamma, households, revision) = {
            let state = self.inner.state.lock().await;
            (
                state.params,
                state.gamma,
                state.households.clone(),
                state.revision,
            )
        };

        let mut outcome = PassOutcome::default();
        for household in &households {
            let Some(members) = validate_household(household) else {
                continue;
            };
            let roles = assign_roles(&members);
            let request = build_lookup_request(&members, &roles);
            match self.inner.lookup.monthly_benefits(&request).await {
                Ok(benefits) => {
                    let surplus = household_surplus(&members, &roles, &params, gamma);
                    outcome.results.insert(
                        household.id,
                        assemble_result(benefits.annual_total(), surplus),
                    );
                }
                Err(error) => {
                    warn!(household = household.id, %error, "baseline lookup failed");
                    outcome.errors.insert(household.id, error.to_string());
                }
            }
        }

        let mut state = self.inner.state.lock().await;
        if state.revision != revision {
            debug!(
                started = revision,
                current = state.revision,
                "discarding stale computation pass"
            );
            return;
        }
        info!(
            households = households.len(),
            computed = outcome.results.len(),
            failed = outcome.errors.len(),
            "computation pass committed"
        );
        state.outcome = Some(outcome);
    }
}
