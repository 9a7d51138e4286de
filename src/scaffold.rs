//! Scaffold descriptors (`spec.md` §3 "Scaffold descriptor").

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScaffoldId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldDescriptor {
    pub scaffold_id: ScaffoldId,
    pub name: String,
    /// bp of 'N' padding emitted to FASTA at this scaffold's borders.
    pub spacer_length: u64,
}
