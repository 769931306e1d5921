// Recipe module - declarative feature extraction instructions
//
// A recipe declares which named feature blocks an engine must compute and how
// many columns they add up to. It performs no DSP itself.
//
// MFCC column layout (each group present only when its flag is set):
//
//     | e    |  energy
//     | c1.. |  coefficients
//     | De   |  energy first derivative
//     | Dc.. |  coefficients first derivatives
//     | DDe  |  energy second derivative
//     | DDc..|  coefficients second derivatives

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::timing::FrameGrid;

/// Default analysis window duration in seconds
pub const DEFAULT_DURATION: f64 = 0.025;

/// Default analysis step in seconds
pub const DEFAULT_STEP: f64 = 0.010;

/// Default number of cepstral coefficients
pub const DEFAULT_NUM_COEFS: usize = 11;

/// Non-zero sample rate in Hz
///
/// Instructions can only be derived once a sample rate has been observed,
/// which is why every sample-rate dependent operation takes this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleRate(u32);

impl SampleRate {
    pub fn new(hz: u32) -> Result<Self, FeatureError> {
        if hz == 0 {
            return Err(FeatureError::InvalidSampleRate { sample_rate: hz });
        }
        Ok(Self(hz))
    }

    pub fn hz(self) -> u32 {
        self.0
    }

    /// Number of samples spanned by `seconds`, rounded to nearest
    pub fn samples(self, seconds: f64) -> usize {
        (self.0 as f64 * seconds).round() as usize
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// One named engine instruction: `name: parameters`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub name: String,
    pub parameters: String,
}

impl Instruction {
    pub fn new(name: impl Into<String>, parameters: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.into(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.parameters)
    }
}

/// Identity of a recipe at a given sample rate
///
/// Two recipes producing the same instructions at the same sample rate are
/// the same artifact. This is the only equality/hashing defined for recipes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecipeFingerprint {
    pub sample_rate: SampleRate,
    pub instructions: Vec<Instruction>,
}

impl RecipeFingerprint {
    /// 64-bit digest, e.g. for in-process cache keys
    pub fn digest(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Zero-crossing rate: one column per frame
#[derive(Debug, Clone, Serialize)]
pub struct ZcrRecipe {
    duration: f64,
    step: f64,
}

impl ZcrRecipe {
    pub fn new(duration: f64, step: f64) -> Result<Self, FeatureError> {
        FrameGrid::centered(duration, step)?;
        Ok(Self { duration, step })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    fn instructions(&self, sample_rate: SampleRate) -> Vec<Instruction> {
        let block_size = sample_rate.samples(self.duration);
        let step_size = sample_rate.samples(self.step);
        vec![Instruction::new(
            "zcr",
            format!("ZCR blockSize={} stepSize={}", block_size, step_size),
        )]
    }
}

impl Default for ZcrRecipe {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            step: DEFAULT_STEP,
        }
    }
}

/// Mel-frequency cepstral coefficients with optional derivatives
///
/// Built with `new` (or `default`) and the `with_*` builders, which consume
/// the recipe and return a new one.
#[derive(Debug, Clone, Serialize)]
pub struct MfccRecipe {
    duration: f64,
    step: f64,
    /// Keep energy (0th coefficient)
    keep_energy: bool,
    /// Number of coefficients, energy excluded
    num_coefs: usize,
    /// Keep energy first derivative
    keep_delta_energy: bool,
    /// Add coefficients first derivatives
    add_delta: bool,
    /// Keep energy second derivative
    keep_delta2_energy: bool,
    /// Add coefficients second derivatives
    add_delta2: bool,
}

impl MfccRecipe {
    pub fn new(duration: f64, step: f64) -> Result<Self, FeatureError> {
        FrameGrid::centered(duration, step)?;
        Ok(Self {
            duration,
            step,
            ..Self::default()
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn keep_energy(&self) -> bool {
        self.keep_energy
    }

    pub fn num_coefs(&self) -> usize {
        self.num_coefs
    }

    pub fn keep_delta_energy(&self) -> bool {
        self.keep_delta_energy
    }

    pub fn add_delta(&self) -> bool {
        self.add_delta
    }

    pub fn keep_delta2_energy(&self) -> bool {
        self.keep_delta2_energy
    }

    pub fn add_delta2(&self) -> bool {
        self.add_delta2
    }

    pub fn with_energy(mut self, keep: bool) -> Self {
        self.keep_energy = keep;
        self
    }

    pub fn with_coefs(mut self, num_coefs: usize) -> Self {
        self.num_coefs = num_coefs;
        self
    }

    pub fn with_delta(mut self, add_delta: bool, keep_delta_energy: bool) -> Self {
        self.add_delta = add_delta;
        self.keep_delta_energy = keep_delta_energy;
        self
    }

    pub fn with_delta2(mut self, add_delta2: bool, keep_delta2_energy: bool) -> Self {
        self.add_delta2 = add_delta2;
        self.keep_delta2_energy = keep_delta2_energy;
        self
    }

    fn dimension(&self) -> usize {
        let mut n_features = 0;
        n_features += self.keep_energy as usize;
        n_features += self.keep_delta_energy as usize;
        n_features += self.keep_delta2_energy as usize;
        n_features += self.num_coefs;
        n_features += self.num_coefs * self.add_delta as usize;
        n_features += self.num_coefs * self.add_delta2 as usize;
        n_features
    }

    /// (name, columns) of every emitted block
    fn blocks(&self) -> Vec<(&'static str, usize)> {
        let mut blocks = vec![("mfcc", self.num_coefs + self.keep_energy as usize)];
        if self.keep_delta_energy || self.add_delta {
            blocks.push((
                "mfcc_d",
                self.add_delta as usize * self.num_coefs + self.keep_delta_energy as usize,
            ));
        }
        if self.keep_delta2_energy || self.add_delta2 {
            blocks.push((
                "mfcc_dd",
                self.add_delta2 as usize * self.num_coefs + self.keep_delta2_energy as usize,
            ));
        }
        blocks
    }

    fn instructions(&self, sample_rate: SampleRate) -> Vec<Instruction> {
        let block_size = sample_rate.samples(self.duration);
        let step_size = sample_rate.samples(self.step);

        // CepsIgnoreFirstCoeff is 0 when energy is kept, 1 when it is dropped
        let block = |keep_energy: bool, num_coeffs: usize, suffix: &str| {
            format!(
                "MFCC CepsIgnoreFirstCoeff={} CepsNbCoeffs={} blockSize={} stepSize={}{}",
                if keep_energy { 0 } else { 1 },
                num_coeffs,
                block_size,
                step_size,
                suffix
            )
        };

        let mut instructions = vec![Instruction::new(
            "mfcc",
            block(
                self.keep_energy,
                self.num_coefs + self.keep_energy as usize,
                "",
            ),
        )];

        if self.keep_delta_energy || self.add_delta {
            instructions.push(Instruction::new(
                "mfcc_d",
                block(
                    self.keep_delta_energy,
                    self.add_delta as usize * self.num_coefs + self.keep_delta_energy as usize,
                    " > Derivate DOrder=1",
                ),
            ));
        }

        if self.keep_delta2_energy || self.add_delta2 {
            instructions.push(Instruction::new(
                "mfcc_dd",
                block(
                    self.keep_delta2_energy,
                    self.add_delta2 as usize * self.num_coefs + self.keep_delta2_energy as usize,
                    " > Derivate DOrder=2",
                ),
            ));
        }

        instructions
    }
}

impl Default for MfccRecipe {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            step: DEFAULT_STEP,
            keep_energy: true,
            num_coefs: DEFAULT_NUM_COEFS,
            keep_delta_energy: false,
            add_delta: false,
            keep_delta2_energy: false,
            add_delta2: false,
        }
    }
}

/// Column-wise concatenation of recipes sharing one frame grid
#[derive(Debug, Clone)]
pub struct CompoundRecipe {
    children: Vec<FeatureRecipe>,
    duration: f64,
    step: f64,
}

impl CompoundRecipe {
    /// Compose `children` on a common (duration, step)
    ///
    /// Fails unless there is at least one child, every child uses exactly
    /// `(duration, step)` and no two children emit the same feature name.
    pub fn new(children: Vec<FeatureRecipe>, duration: f64, step: f64) -> Result<Self, FeatureError> {
        FrameGrid::centered(duration, step)?;
        if children.is_empty() {
            return Err(FeatureError::EmptyCompound);
        }

        for child in &children {
            if child.duration() != duration || child.step() != step {
                return Err(FeatureError::IncompatibleRecipes {
                    expected: (duration, step),
                    found: (child.duration(), child.step()),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for name in children.iter().flat_map(|child| child.feature_names()) {
            if !seen.insert(name) {
                return Err(FeatureError::DuplicateFeatureName {
                    name: name.to_string(),
                });
            }
        }

        Ok(Self {
            children,
            duration,
            step,
        })
    }

    /// Compose `children` on the (duration, step) of the first child
    pub fn from_children(children: Vec<FeatureRecipe>) -> Result<Self, FeatureError> {
        let (duration, step) = children
            .first()
            .map(|child| (child.duration(), child.step()))
            .ok_or(FeatureError::EmptyCompound)?;
        Self::new(children, duration, step)
    }

    pub fn children(&self) -> &[FeatureRecipe] {
        &self.children
    }
}

/// Closed set of feature recipes
#[derive(Debug, Clone)]
pub enum FeatureRecipe {
    Zcr(ZcrRecipe),
    Mfcc(MfccRecipe),
    Compound(CompoundRecipe),
}

impl FeatureRecipe {
    /// Number of columns produced per frame, independent of sample rate
    pub fn dimension(&self) -> usize {
        match self {
            FeatureRecipe::Zcr(_) => 1,
            FeatureRecipe::Mfcc(mfcc) => mfcc.dimension(),
            FeatureRecipe::Compound(compound) => {
                compound.children.iter().map(FeatureRecipe::dimension).sum()
            }
        }
    }

    /// Ordered engine instructions at `sample_rate`
    ///
    /// Block and step sizes are recomputed from the sample rate on every call.
    /// Names are unique within one recipe.
    pub fn instructions(&self, sample_rate: SampleRate) -> Vec<Instruction> {
        match self {
            FeatureRecipe::Zcr(zcr) => zcr.instructions(sample_rate),
            FeatureRecipe::Mfcc(mfcc) => mfcc.instructions(sample_rate),
            FeatureRecipe::Compound(compound) => compound
                .children
                .iter()
                .flat_map(|child| child.instructions(sample_rate))
                .collect(),
        }
    }

    /// Names of the emitted feature blocks, in declaration order
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.blocks().into_iter().map(|(name, _)| name).collect()
    }

    /// (name, columns) of the emitted feature blocks, in declaration order
    ///
    /// Names match `instructions` one to one and the column counts add up
    /// to `dimension`.
    pub fn blocks(&self) -> Vec<(&'static str, usize)> {
        match self {
            FeatureRecipe::Zcr(_) => vec![("zcr", 1)],
            FeatureRecipe::Mfcc(mfcc) => mfcc.blocks(),
            FeatureRecipe::Compound(compound) => compound
                .children
                .iter()
                .flat_map(FeatureRecipe::blocks)
                .collect(),
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            FeatureRecipe::Zcr(zcr) => zcr.duration,
            FeatureRecipe::Mfcc(mfcc) => mfcc.duration,
            FeatureRecipe::Compound(compound) => compound.duration,
        }
    }

    pub fn step(&self) -> f64 {
        match self {
            FeatureRecipe::Zcr(zcr) => zcr.step,
            FeatureRecipe::Mfcc(mfcc) => mfcc.step,
            FeatureRecipe::Compound(compound) => compound.step,
        }
    }

    /// Centered grid timing the frames this recipe produces
    pub fn grid(&self) -> Result<FrameGrid, FeatureError> {
        FrameGrid::centered(self.duration(), self.step())
    }

    /// Identity of this recipe once the sample rate is known
    pub fn fingerprint(&self, sample_rate: SampleRate) -> RecipeFingerprint {
        RecipeFingerprint {
            sample_rate,
            instructions: self.instructions(sample_rate),
        }
    }
}

impl From<ZcrRecipe> for FeatureRecipe {
    fn from(recipe: ZcrRecipe) -> Self {
        FeatureRecipe::Zcr(recipe)
    }
}

impl From<MfccRecipe> for FeatureRecipe {
    fn from(recipe: MfccRecipe) -> Self {
        FeatureRecipe::Mfcc(recipe)
    }
}

impl From<CompoundRecipe> for FeatureRecipe {
    fn from(recipe: CompoundRecipe) -> Self {
        FeatureRecipe::Compound(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sr(hz: u32) -> SampleRate {
        SampleRate::new(hz).unwrap()
    }

    #[test]
    fn test_sample_rate_rejects_zero() {
        assert!(SampleRate::new(0).is_err());
        assert_eq!(sr(16000).samples(0.025), 400);
        assert_eq!(sr(44100).samples(0.010), 441);
    }

    #[test]
    fn test_zcr_instruction() {
        let recipe = FeatureRecipe::from(ZcrRecipe::default());
        assert_eq!(recipe.dimension(), 1);
        assert_eq!(
            recipe.instructions(sr(16000)),
            vec![Instruction::new("zcr", "ZCR blockSize=400 stepSize=160")]
        );
    }

    #[test]
    fn test_instructions_follow_sample_rate() {
        let recipe = FeatureRecipe::from(ZcrRecipe::default());
        let at_16k = recipe.instructions(sr(16000));
        let at_8k = recipe.instructions(sr(8000));
        assert_eq!(at_8k[0].parameters, "ZCR blockSize=200 stepSize=80");
        assert_eq!(recipe.instructions(sr(16000)), at_16k);
    }

    #[test]
    fn test_mfcc_energy_only() {
        let recipe = FeatureRecipe::from(MfccRecipe::default().with_coefs(11).with_energy(true));
        assert_eq!(recipe.dimension(), 12);

        let instructions = recipe.instructions(sr(16000));
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].name, "mfcc");
        assert_eq!(
            instructions[0].parameters,
            "MFCC CepsIgnoreFirstCoeff=0 CepsNbCoeffs=12 blockSize=400 stepSize=160"
        );
    }

    #[test]
    fn test_mfcc_delta_without_energy() {
        let recipe = FeatureRecipe::from(MfccRecipe::default().with_delta(true, false));
        assert_eq!(recipe.dimension(), 23);

        let instructions = recipe.instructions(sr(16000));
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].name, "mfcc_d");
        assert_eq!(
            instructions[1].parameters,
            "MFCC CepsIgnoreFirstCoeff=1 CepsNbCoeffs=11 blockSize=400 stepSize=160 > Derivate DOrder=1"
        );
    }

    #[test]
    fn test_mfcc_energy_derivatives_only() {
        let recipe = MfccRecipe::default()
            .with_energy(false)
            .with_delta(false, true)
            .with_delta2(false, true);
        let recipe = FeatureRecipe::from(recipe);
        assert_eq!(recipe.dimension(), 13);

        let instructions = recipe.instructions(sr(16000));
        assert_eq!(
            instructions
                .iter()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>(),
            vec!["mfcc", "mfcc_d", "mfcc_dd"]
        );
        assert!(instructions[0]
            .parameters
            .starts_with("MFCC CepsIgnoreFirstCoeff=1 CepsNbCoeffs=11 "));
        assert!(instructions[1]
            .parameters
            .starts_with("MFCC CepsIgnoreFirstCoeff=0 CepsNbCoeffs=1 "));
        assert!(instructions[2].parameters.ends_with("> Derivate DOrder=2"));
    }

    #[test]
    fn test_mfcc_full_dimension() {
        let recipe = MfccRecipe::default()
            .with_delta(true, true)
            .with_delta2(true, true);
        assert_eq!(FeatureRecipe::from(recipe).dimension(), 36);
    }

    #[test]
    fn test_compound_dimension_and_order() {
        let compound = CompoundRecipe::from_children(vec![
            MfccRecipe::default().with_delta(true, false).into(),
            ZcrRecipe::default().into(),
        ])
        .unwrap();
        let recipe = FeatureRecipe::from(compound);

        assert_eq!(recipe.dimension(), 23 + 1);
        let names: Vec<String> = recipe
            .instructions(sr(16000))
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["mfcc", "mfcc_d", "zcr"]);
        assert_eq!(recipe.feature_names(), vec!["mfcc", "mfcc_d", "zcr"]);
    }

    #[test]
    fn test_compound_rejects_different_step() {
        let err = CompoundRecipe::from_children(vec![
            ZcrRecipe::new(0.025, 0.010).unwrap().into(),
            MfccRecipe::new(0.025, 0.020).unwrap().into(),
        ])
        .unwrap_err();

        assert!(matches!(err, FeatureError::IncompatibleRecipes { .. }));
    }

    #[test]
    fn test_compound_rejects_mismatch_with_own_grid() {
        let err = CompoundRecipe::new(vec![ZcrRecipe::default().into()], 0.050, 0.010).unwrap_err();
        assert!(matches!(err, FeatureError::IncompatibleRecipes { .. }));
    }

    #[test]
    fn test_compound_rejects_duplicate_names() {
        let err = CompoundRecipe::from_children(vec![
            ZcrRecipe::default().into(),
            ZcrRecipe::default().into(),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            FeatureError::DuplicateFeatureName {
                name: "zcr".to_string()
            }
        );
    }

    #[test]
    fn test_nested_compound() {
        let inner = CompoundRecipe::from_children(vec![ZcrRecipe::default().into()]).unwrap();
        let outer =
            CompoundRecipe::from_children(vec![inner.into(), MfccRecipe::default().into()])
                .unwrap();
        let recipe = FeatureRecipe::from(outer);
        assert_eq!(recipe.dimension(), 13);
        assert_eq!(recipe.feature_names(), vec!["zcr", "mfcc"]);
    }

    #[test]
    fn test_fingerprint_equality() {
        let a = FeatureRecipe::from(MfccRecipe::default());
        let b = FeatureRecipe::from(
            CompoundRecipe::from_children(vec![MfccRecipe::default().into()]).unwrap(),
        );
        let c = FeatureRecipe::from(MfccRecipe::default().with_coefs(12));

        assert_eq!(a.fingerprint(sr(16000)), b.fingerprint(sr(16000)));
        assert_eq!(
            a.fingerprint(sr(16000)).digest(),
            b.fingerprint(sr(16000)).digest()
        );
        assert_ne!(a.fingerprint(sr(16000)), c.fingerprint(sr(16000)));
        assert_ne!(a.fingerprint(sr(16000)), a.fingerprint(sr(8000)));
    }

    #[test]
    fn test_recipe_grid_is_centered() {
        let grid = FeatureRecipe::from(ZcrRecipe::default()).grid().unwrap();
        assert_eq!(grid.start(), -0.0125);
        assert_eq!(grid.duration(), 0.025);
        assert_eq!(grid.step(), 0.010);
    }

    #[test]
    fn test_empty_compound_rejected() {
        assert_eq!(
            CompoundRecipe::from_children(vec![]).unwrap_err(),
            FeatureError::EmptyCompound
        );
        assert_eq!(
            CompoundRecipe::new(vec![], DEFAULT_DURATION, DEFAULT_STEP).unwrap_err(),
            FeatureError::EmptyCompound
        );
    }

    #[test]
    fn test_blocks_match_instructions_and_dimension() {
        let recipe = FeatureRecipe::from(
            CompoundRecipe::from_children(vec![
                ZcrRecipe::default().into(),
                MfccRecipe::default()
                    .with_energy(false)
                    .with_delta(true, true)
                    .with_delta2(false, true)
                    .into(),
            ])
            .unwrap(),
        );

        let blocks = recipe.blocks();
        assert_eq!(
            blocks,
            vec![("zcr", 1), ("mfcc", 11), ("mfcc_d", 12), ("mfcc_dd", 1)]
        );
        assert_eq!(
            blocks.iter().map(|(_, cols)| cols).sum::<usize>(),
            recipe.dimension()
        );

        let names: Vec<String> = recipe
            .instructions(sr(16000))
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, recipe.feature_names());
    }

    #[test]
    fn test_builders_return_new_recipe() {
        let base = MfccRecipe::new(0.030, 0.015).unwrap();
        let derived = base.clone().with_coefs(13).with_delta(true, false);

        assert_eq!(base.num_coefs(), DEFAULT_NUM_COEFS);
        assert!(!base.add_delta());
        assert_eq!(derived.num_coefs(), 13);
        assert!(derived.add_delta());
        assert!(derived.keep_energy());
        assert_eq!(derived.duration(), 0.030);
        assert_eq!(derived.step(), 0.015);
    }

    #[test]
    fn test_invalid_window_rejected() {
        assert!(ZcrRecipe::new(0.0, 0.01).is_err());
        assert!(MfccRecipe::new(0.025, -0.01).is_err());
    }
}
