/// Address of one blob in a pager.
pub type PhysicalKey = u64;
