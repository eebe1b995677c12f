//! Contract creation wizard.
//!
//! A strongly-typed partial-record accumulator: one optional record per
//! step, merged by [`WizardDraft::apply`] after per-step validation.
//! The accumulator is pure; session scoping and clearing live in the
//! API layer. Uploaded bytes are buffered in the draft and only written
//! out when the wizard commits.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  contract::{Category, ContractStatus, NewContract, validate_dates},
  file::validate_upload,
};

/// Title used when a draft is parked without ever naming it.
pub const UNTITLED: &str = "Untitled Contract";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationMethod {
  Upload,
  Template,
}

/// Wizard steps in presentation order. Upload is conditional: drafts
/// built from a template skip it in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
  Method,
  Upload,
  Name,
  Basic,
  Party,
  Dates,
  Value,
  OwnerTags,
}

const ORDER: &[WizardStep] = &[
  WizardStep::Method,
  WizardStep::Upload,
  WizardStep::Name,
  WizardStep::Basic,
  WizardStep::Party,
  WizardStep::Dates,
  WizardStep::Value,
  WizardStep::OwnerTags,
];

// ─── Step inputs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameStep {
  pub title:       String,
  #[serde(default)]
  pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicStep {
  pub category:         Category,
  #[serde(default)]
  pub sub_category:     String,
  #[serde(default)]
  pub org_entity:       String,
  #[serde(default)]
  pub region_country:   String,
  pub department_id:    Option<i64>,
  pub contract_type_id: Option<i64>,
  #[serde(default)]
  pub is_confidential:  bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyStep {
  pub counterparty_name:    String,
  #[serde(default)]
  pub counterparty_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatesStep {
  pub effective_date:      NaiveDate,
  pub end_date:            Option<NaiveDate>,
  pub renewal_notice_date: Option<NaiveDate>,
  #[serde(default)]
  pub auto_renewal:        bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueStep {
  pub value_amount:   Option<Decimal>,
  #[serde(default)]
  pub currency:       String,
  #[serde(default)]
  pub opportunity_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerTagsStep {
  pub owner_id: Option<Uuid>,
  #[serde(default)]
  pub tag_ids:  Vec<i64>,
}

/// One wizard form submission, tagged by step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepInput {
  Method { method: CreationMethod },
  Name(NameStep),
  Basic(BasicStep),
  Party(PartyStep),
  Dates(DatesStep),
  Value(ValueStep),
  OwnerTags(OwnerTagsStep),
}

impl StepInput {
  pub fn step(&self) -> WizardStep {
    match self {
      Self::Method { .. } => WizardStep::Method,
      Self::Name(_) => WizardStep::Name,
      Self::Basic(_) => WizardStep::Basic,
      Self::Party(_) => WizardStep::Party,
      Self::Dates(_) => WizardStep::Dates,
      Self::Value(_) => WizardStep::Value,
      Self::OwnerTags(_) => WizardStep::OwnerTags,
    }
  }
}

/// Bytes held until commit; written beneath the blob root only once the
/// contract exists.
#[derive(Debug, Clone)]
pub struct BufferedUpload {
  pub filename:   String,
  pub media_type: String,
  pub bytes:      Vec<u8>,
}

/// The accumulated wizard state for one user session.
#[derive(Debug, Clone, Default)]
pub struct WizardDraft {
  pub method:     Option<CreationMethod>,
  pub upload:     Option<BufferedUpload>,
  pub name:       Option<NameStep>,
  pub basic:      Option<BasicStep>,
  pub party:      Option<PartyStep>,
  pub dates:      Option<DatesStep>,
  pub value:      Option<ValueStep>,
  pub owner_tags: Option<OwnerTagsStep>,
}

/// What the wizard hands to the store on commit.
#[derive(Debug, Clone)]
pub struct ContractSubmission {
  pub contract: NewContract,
  pub upload:   Option<BufferedUpload>,
}

impl WizardDraft {
  fn skips(&self, step: WizardStep) -> bool {
    step == WizardStep::Upload && self.method == Some(CreationMethod::Template)
  }

  /// Validate one step's input and merge it into the draft.
  pub fn apply(&mut self, input: StepInput) -> Result<()> {
    match input {
      StepInput::Method { method } => {
        self.method = Some(method);
        if method == CreationMethod::Template {
          self.upload = None;
        }
      }
      StepInput::Name(name) => {
        if name.title.trim().is_empty() {
          return Err(Error::Validation("title must not be empty".into()));
        }
        self.name = Some(name);
      }
      StepInput::Basic(basic) => self.basic = Some(basic),
      StepInput::Party(party) => {
        if party.counterparty_name.trim().is_empty() {
          return Err(Error::Validation(
            "counterparty name must not be empty".into(),
          ));
        }
        self.party = Some(party);
      }
      StepInput::Dates(dates) => {
        validate_dates(
          Some(dates.effective_date),
          dates.end_date,
          dates.renewal_notice_date,
        )?;
        self.dates = Some(dates);
      }
      StepInput::Value(value) => self.value = Some(value),
      StepInput::OwnerTags(owner_tags) => self.owner_tags = Some(owner_tags),
    }
    Ok(())
  }

  /// Buffer an uploaded document after size and extension checks.
  pub fn attach_upload(&mut self, upload: BufferedUpload) -> Result<()> {
    if self.method != Some(CreationMethod::Upload) {
      return Err(Error::Validation(
        "uploads are only accepted for the upload creation method".into(),
      ));
    }
    validate_upload(&upload.filename, upload.bytes.len() as i64)?;
    self.upload = Some(upload);
    Ok(())
  }

  /// The step following `step`, honoring the conditional Upload skip.
  pub fn next_after(&self, step: WizardStep) -> Option<WizardStep> {
    let idx = ORDER.iter().position(|s| *s == step)?;
    ORDER[idx + 1..].iter().copied().find(|s| !self.skips(*s))
  }

  /// The step preceding `step`, honoring the conditional Upload skip.
  pub fn prev_before(&self, step: WizardStep) -> Option<WizardStep> {
    let idx = ORDER.iter().position(|s| *s == step)?;
    ORDER[..idx].iter().rev().copied().find(|s| !self.skips(*s))
  }

  fn filled(&self, step: WizardStep) -> bool {
    match step {
      WizardStep::Method => self.method.is_some(),
      WizardStep::Upload => self.upload.is_some(),
      WizardStep::Name => self.name.is_some(),
      WizardStep::Basic => self.basic.is_some(),
      WizardStep::Party => self.party.is_some(),
      WizardStep::Dates => self.dates.is_some(),
      WizardStep::Value => self.value.is_some(),
      WizardStep::OwnerTags => self.owner_tags.is_some(),
    }
  }

  /// The first step still missing input, skips excluded.
  pub fn first_incomplete(&self) -> Option<WizardStep> {
    ORDER
      .iter()
      .copied()
      .find(|s| !self.skips(*s) && !self.filled(*s))
  }

  pub fn is_complete(&self) -> bool {
    self.first_incomplete().is_none()
  }

  /// Turn the draft into a submission. Saving as a draft is allowed at
  /// any point and fills in defaults; submitting for real requires
  /// every non-skipped step.
  pub fn into_submission(
    self,
    actor_id: Uuid,
    as_draft: bool,
  ) -> Result<ContractSubmission> {
    if !as_draft && let Some(missing) = self.first_incomplete() {
      return Err(Error::Validation(format!(
        "wizard step {missing:?} is incomplete"
      )));
    }

    let title = match &self.name {
      Some(name) if !name.title.trim().is_empty() => name.title.clone(),
      _ if as_draft => UNTITLED.to_owned(),
      _ => {
        return Err(Error::Validation("title must not be empty".into()));
      }
    };
    let extra = match &self.name {
      Some(name) if !name.description.is_empty() => {
        serde_json::json!({ "description": name.description })
      }
      _ => serde_json::Value::Null,
    };

    let basic = self.basic.unwrap_or(BasicStep {
      category:         Category::Other,
      sub_category:     String::new(),
      org_entity:       String::new(),
      region_country:   String::new(),
      department_id:    None,
      contract_type_id: None,
      is_confidential:  false,
    });
    let party = self.party.unwrap_or(PartyStep {
      counterparty_name:    String::new(),
      counterparty_address: String::new(),
    });
    let value = self.value.unwrap_or(ValueStep {
      value_amount:   None,
      currency:       String::new(),
      opportunity_id: String::new(),
    });
    let owner_tags = self.owner_tags.unwrap_or(OwnerTagsStep {
      owner_id: None,
      tag_ids:  Vec::new(),
    });

    let contract = NewContract {
      title,
      status: if as_draft {
        ContractStatus::Draft
      } else {
        ContractStatus::Pending
      },
      category: basic.category,
      sub_category: basic.sub_category,
      org_entity: basic.org_entity,
      region_country: basic.region_country,
      department_id: basic.department_id,
      counterparty_name: party.counterparty_name,
      counterparty_address: party.counterparty_address,
      contract_type_id: basic.contract_type_id,
      value_amount: value.value_amount,
      currency: value.currency,
      opportunity_id: value.opportunity_id,
      effective_date: self.dates.as_ref().map(|d| d.effective_date),
      end_date: self.dates.as_ref().and_then(|d| d.end_date),
      auto_renewal: self.dates.as_ref().is_some_and(|d| d.auto_renewal),
      renewal_notice_date: self
        .dates
        .as_ref()
        .and_then(|d| d.renewal_notice_date),
      owner_id: Some(owner_tags.owner_id.unwrap_or(actor_id)),
      created_by: Some(actor_id),
      is_confidential: basic.is_confidential,
      extra,
      tag_ids: owner_tags.tag_ids,
    };
    contract.validate()?;

    Ok(ContractSubmission { contract, upload: self.upload })
  }
}
