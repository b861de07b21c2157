//! Pagination and operation-result wire types shared by the gateways.

use serde::{Deserialize, Serialize};

/// One page of a paginated backend listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Zero-based page number
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> PageResponse<T> {
    /// Whether another page exists after this one.
    pub fn has_more(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

/// Answer of delete and update calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub affected_records: u64,
    #[serde(default)]
    pub message: Option<String>,
}

impl OperationResult {
    pub fn affected_any(&self) -> bool {
        self.affected_records > 0
    }
}

/// Pagination metadata kept alongside an accumulated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl PaginationInfo {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size,
            total_elements: 0,
            total_pages: 0,
        }
    }

    pub fn from_page<T>(response: &PageResponse<T>) -> Self {
        Self {
            page: response.page,
            page_size: response.size,
            total_elements: response.total_elements,
            total_pages: response.total_pages,
        }
    }

    /// Recomputes `total_pages` from `total_elements` and `page_size`.
    pub fn recompute_total_pages(&mut self) {
        self.total_pages = total_pages(self.total_elements, self.page_size);
    }
}

/// `ceil(total_elements / page_size)`; zero when the page size is zero.
pub fn total_pages(total_elements: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_elements.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(45, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(12, 20), 1);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_page_response_wire_format() {
        let json = r#"{"content":[1,2],"page":2,"size":20,"totalElements":45,"totalPages":3}"#;
        let page: PageResponse<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(page.content, vec![1, 2]);
        assert!(!page.has_more());

        let info = PaginationInfo::from_page(&page);
        assert_eq!(info.page_size, 20);
        assert_eq!(info.total_elements, 45);
    }

    #[test]
    fn test_task_page_deserializes() {
        let json = r#"{
            "content": [
                {"id": 3, "name": "Ship", "status": "OPEN", "priority": "LOW", "description": null}
            ],
            "page": 0,
            "size": 20,
            "totalElements": 1,
            "totalPages": 1
        }"#;
        let page: PageResponse<Task> = serde_json::from_str(json).unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].description, "");

        let empty: PageResponse<Task> = serde_json::from_str(
            r#"{"page":0,"size":20,"totalElements":0,"totalPages":0}"#,
        )
        .unwrap();
        assert!(empty.content.is_empty());
    }

    #[test]
    fn test_operation_result() {
        let result: OperationResult =
            serde_json::from_str(r#"{"affectedRecords":0,"message":"nothing"}"#).unwrap();
        assert!(!result.affected_any());
        assert_eq!(result.message.as_deref(), Some("nothing"));
    }
}
