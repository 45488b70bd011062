use crate::constants::{STEP_TYPE_PRIMITIVE, STEP_TYPE_SUBPIPELINE};
use crate::entities::{are_lists_tantamount, DataReference, DocumentReference, Primitive, Tantamount};
use crate::errors::{EntityError, EntityResult};
use crate::utils::{enforce_field, JsonExt};
use itertools::{EitherOrBoth, Itertools};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A pair of steps that differ between two pipelines. `None` marks a
/// position that only exists on one side.
pub type StepMismatch<'a> = (Option<&'a Primitive>, Option<&'a Primitive>);

/// A pipeline step as read from the dump, before sub-pipelines are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum StepDocument {
    Primitive(Primitive),
    Subpipeline(DocumentReference),
}

impl TryFrom<&Value> for StepDocument {
    type Error = EntityError;

    fn try_from(step: &Value) -> EntityResult<Self> {
        match step.required_str("type")? {
            STEP_TYPE_PRIMITIVE => Ok(StepDocument::Primitive(Primitive::try_from(step)?)),
            STEP_TYPE_SUBPIPELINE => Ok(StepDocument::Subpipeline(DocumentReference::try_from(
                step.required("pipeline")?,
            )?)),
            other => Err(EntityError::UnsupportedStepType(other.to_string())),
        }
    }
}

/// First phase of pipeline construction: every field parsed, sub-pipelines
/// still held as digest stubs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDocument {
    pub digest: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub source_name: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<DataReference>,
    pub steps: Vec<StepDocument>,
}

impl PipelineDocument {
    pub fn from_document(document: &Value, should_enforce_id: bool) -> EntityResult<Self> {
        enforce_field(should_enforce_id, document, "digest")?;

        let inputs = document
            .required_vec("inputs")?
            .iter()
            .map(|input| input.required_string("name"))
            .collect::<EntityResult<Vec<_>>>()?;

        let outputs = document
            .required_vec("outputs")?
            .iter()
            .map(|output| output.required_str("data")?.parse::<DataReference>())
            .collect::<EntityResult<Vec<DataReference>>>()?;

        let steps = document
            .required_vec("steps")?
            .iter()
            .map(StepDocument::try_from)
            .collect::<EntityResult<Vec<_>>>()?;

        let source_name = document
            .get_path(&["source", "name"])
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            digest: document.optional_string("digest")?,
            id: document.optional_string("id")?,
            name: document.optional_string("name")?,
            source_name,
            inputs,
            outputs,
            steps,
        })
    }

    /// Key under which the pipeline is stored in the corpus: its digest,
    /// or its id for sources that do not compute digests.
    pub fn key(&self) -> EntityResult<&str> {
        self.digest
            .as_deref()
            .or(self.id.as_deref())
            .ok_or_else(|| EntityError::missing("digest"))
    }

    pub fn subpipeline_references(&self) -> impl Iterator<Item = &DocumentReference> {
        self.steps.iter().filter_map(|step| match step {
            StepDocument::Subpipeline(reference) => Some(reference),
            StepDocument::Primitive(_) => None,
        })
    }

    /// Second phase: swaps every sub-pipeline stub for the resolved pipeline.
    pub fn resolve<F>(self, mut resolve_subpipeline: F) -> EntityResult<Pipeline>
    where
        F: FnMut(&DocumentReference) -> EntityResult<Arc<Pipeline>>,
    {
        let steps = self
            .steps
            .into_iter()
            .map(|step| match step {
                StepDocument::Primitive(primitive) => Ok(PipelineStep::Primitive(primitive)),
                StepDocument::Subpipeline(reference) => {
                    resolve_subpipeline(&reference).map(PipelineStep::Subpipeline)
                }
            })
            .collect::<EntityResult<Vec<_>>>()?;

        Ok(Pipeline {
            digest: self.digest,
            id: self.id,
            name: self.name,
            source_name: self.source_name,
            inputs: self.inputs,
            outputs: self.outputs,
            steps,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStep {
    Primitive(Primitive),
    Subpipeline(Arc<Pipeline>),
}

impl PipelineStep {
    /// The primitives this step executes, depth first.
    pub fn primitives(&self) -> Vec<&Primitive> {
        match self {
            PipelineStep::Primitive(primitive) => vec![primitive],
            PipelineStep::Subpipeline(pipeline) => pipeline.flattened_steps(),
        }
    }
}

impl Tantamount for PipelineStep {
    fn is_tantamount_to(&self, other: &Self) -> bool {
        match (self, other) {
            (PipelineStep::Primitive(a), PipelineStep::Primitive(b)) => a.is_tantamount_to(b),
            (PipelineStep::Subpipeline(a), PipelineStep::Subpipeline(b)) => a.is_tantamount_to(b),
            _ => false,
        }
    }
}

/// A fully resolved pipeline. Immutable and shared through `Arc` once the
/// corpus is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub digest: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub source_name: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<DataReference>,
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new(digest: impl Into<String>, steps: Vec<PipelineStep>) -> Self {
        Self {
            digest: Some(digest.into()),
            id: None,
            name: None,
            source_name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            steps,
        }
    }

    pub fn key(&self) -> &str {
        self.digest.as_deref().or(self.id.as_deref()).unwrap_or_default()
    }

    pub fn has_subpipeline(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, PipelineStep::Subpipeline(_)))
    }

    /// Depth-first expansion of every nested sub-pipeline into one ordered
    /// list of primitives.
    pub fn flattened_steps(&self) -> Vec<&Primitive> {
        self.steps.iter().flat_map(PipelineStep::primitives).collect()
    }

    /// Number of steps that differ between the two pipelines, paired by
    /// position. Extra trailing steps count one each. A primitive facing a
    /// sub-pipeline counts every primitive of the sub-pipeline.
    pub fn step_distance(&self, other: &Pipeline) -> usize {
        let length_difference = self.steps.len().abs_diff(other.steps.len());
        let content_difference: usize = self
            .steps
            .iter()
            .zip(&other.steps)
            .map(|pair| match pair {
                (PipelineStep::Primitive(a), PipelineStep::Primitive(b)) => {
                    usize::from(!a.is_tantamount_to(b))
                }
                (PipelineStep::Subpipeline(a), PipelineStep::Subpipeline(b)) => a.step_distance(b),
                (PipelineStep::Primitive(_), PipelineStep::Subpipeline(sub))
                | (PipelineStep::Subpipeline(sub), PipelineStep::Primitive(_)) => {
                    sub.flattened_steps().len()
                }
            })
            .sum();
        length_difference + content_difference
    }

    /// The mismatching step pairs behind [`Pipeline::step_distance`].
    ///
    /// Sub-pipeline comparisons are spliced into the result instead of
    /// being reported as one entry. Trailing steps with no counterpart come
    /// back one-sided, a trailing sub-pipeline as one entry per primitive.
    pub fn step_mismatches<'a>(&'a self, other: &'a Pipeline) -> Vec<StepMismatch<'a>> {
        let mut mismatches = Vec::new();
        for pair in self.steps.iter().zip_longest(&other.steps) {
            match pair {
                EitherOrBoth::Both(PipelineStep::Primitive(a), PipelineStep::Primitive(b)) => {
                    if !a.is_tantamount_to(b) {
                        mismatches.push((Some(a), Some(b)));
                    }
                }
                EitherOrBoth::Both(PipelineStep::Subpipeline(a), PipelineStep::Subpipeline(b)) => {
                    mismatches.extend(a.step_mismatches(b));
                }
                EitherOrBoth::Both(a, b) => {
                    mismatches.extend(
                        a.primitives()
                            .into_iter()
                            .zip_longest(b.primitives())
                            .map(|pair| pair.left_and_right()),
                    );
                }
                EitherOrBoth::Left(a) => {
                    mismatches.extend(a.primitives().into_iter().map(|p| (Some(p), None)));
                }
                EitherOrBoth::Right(b) => {
                    mismatches.extend(b.primitives().into_iter().map(|p| (None, Some(p))));
                }
            }
        }
        mismatches
    }

    fn write_steps(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "\t".repeat(indent);
        for step in &self.steps {
            match step {
                PipelineStep::Primitive(primitive) => {
                    writeln!(f, "{pad}{} ({})", primitive.short_python_path(), primitive.id)?
                }
                PipelineStep::Subpipeline(pipeline) => {
                    writeln!(f, "{pad}subpipeline {}:", pipeline.key())?;
                    pipeline.write_steps(f, indent + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl Tantamount for Pipeline {
    /// Same outputs and element-wise tantamount steps. Digests are ignored.
    fn is_tantamount_to(&self, other: &Self) -> bool {
        self.outputs == other.outputs && are_lists_tantamount(&self.steps, &other.steps)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_steps(f, 0)
    }
}
