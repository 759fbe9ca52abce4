use bytes::Bytes;

/// One uploaded file, as received from the multipart body
#[derive(Debug, Clone)]
pub struct FileInput {
    /// Client-supplied filename
    pub name: String,
    /// Content type from the multipart part, if the client sent one
    pub content_type: Option<String>,
    /// Raw file bytes
    pub bytes: Bytes,
}

impl FileInput {
    /// Effective MIME type: the declared one, falling back to a guess from
    /// the filename extension, then `application/octet-stream`
    pub fn mime_type(&self) -> String {
        if let Some(declared) = &self.content_type
            && !declared.is_empty()
        {
            return declared.clone();
        }
        mime_guess::from_path(&self.name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_owned()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Name and size of a file, for inclusion/exclusion reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub size: usize,
}

/// The single file that crossed the budget boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFile {
    pub name: String,
    pub size: usize,
    /// Characters of this file that made it into the allocation
    pub included_chars: usize,
}

/// Result of running the budget allocator over one upload batch
#[derive(Debug, Clone, Default)]
pub struct BudgetAllocation {
    /// One entry per included or partial text file, wrapped in filename
    /// markers, in upload order
    pub extracted_parts: Vec<String>,
    /// Base64 data URLs for every image file, in upload order
    pub image_parts: Vec<String>,
    /// Characters counted against the budget (Unicode scalar values)
    pub total_raw_chars: usize,
    /// The tier's character cap this allocation ran under
    pub max_chars: usize,
    /// Whether anything was truncated or excluded for size
    pub limit_exceeded: bool,
    pub included_files: Vec<FileStat>,
    pub excluded_files: Vec<FileStat>,
    /// At most one file is partial; everything after it is excluded
    pub partial_file: Option<PartialFile>,
}

impl BudgetAllocation {
    /// Joined prompt text for the provider call
    pub fn combined_text(&self) -> String {
        self.extracted_parts.join("\n\n")
    }

    /// Whether anything usable came out of the batch
    pub fn has_content(&self) -> bool {
        !self.extracted_parts.is_empty() || !self.image_parts.is_empty()
    }
}
