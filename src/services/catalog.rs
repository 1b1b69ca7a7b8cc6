use std::collections::HashMap;

use crate::models::domain::{Exam, ExamPrices, Organization, SuggestedBook};

/// Merges live prices, category question sources and recommended books into
/// every exam, working on a copy of `organizations`.
///
/// Derived fields are always recomputed from their inputs, so feeding the
/// output back in with the same prices yields the same result.
pub fn process_organizations(
    organizations: &[Organization],
    exam_prices: &ExamPrices,
) -> Vec<Organization> {
    organizations
        .iter()
        .cloned()
        .map(|mut org| {
            let books: HashMap<&str, &SuggestedBook> = org
                .suggested_books
                .iter()
                .map(|book| (book.id.as_str(), book))
                .collect();
            let category_urls = category_source_urls(&org);

            let exams = org
                .exams
                .iter()
                .map(|exam| merge_exam(exam, &books, &category_urls, exam_prices))
                .collect();
            org.exams = exams;
            org
        })
        .collect()
}

/// Exam id -> question source URL donated by its product category.
fn category_source_urls(org: &Organization) -> HashMap<String, String> {
    let mut urls = HashMap::new();
    for category in &org.exam_product_categories {
        let Some(url) = category
            .question_source_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
        else {
            continue;
        };
        for exam_id in [&category.practice_exam_id, &category.certification_exam_id]
            .into_iter()
            .flatten()
        {
            urls.insert(exam_id.clone(), url.to_string());
        }
    }
    urls
}

fn merge_exam(
    exam: &Exam,
    books: &HashMap<&str, &SuggestedBook>,
    category_urls: &HashMap<String, String>,
    exam_prices: &ExamPrices,
) -> Exam {
    let mut merged = exam.clone();

    if let Some(url) = category_urls.get(&exam.id) {
        merged.question_source_url = Some(url.clone());
    }

    if let Some(record) = exam
        .product_sku
        .as_deref()
        .and_then(|sku| exam_prices.get(sku))
    {
        merged.price = record.price.or(exam.price);
        merged.regular_price = record.regular_price.or(exam.regular_price);
    }

    merged.recommended_book = exam
        .recommended_book_id
        .as_deref()
        .and_then(|id| books.get(id))
        .map(|book| (*book).clone());

    merged
}
