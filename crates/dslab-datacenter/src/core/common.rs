/// Result of checking whether a VM fits into the remaining host capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationVerdict {
    NotEnoughCPU,
    NotEnoughMemory,
    NotEnoughStorage,
    Success,
}
