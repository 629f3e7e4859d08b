mod common;

use anyhow::Result;
use common::{StandardProducts, parse_date, test_service};
use stockbook::io::{ImportOptions, Importer};

#[tokio::test]
async fn test_import_sales_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardProducts::create_basic(&service).await?;
    StandardProducts::stock(&service, "Green Tea", 48, parse_date("2024-05-01")).await?;
    StandardProducts::stock(&service, "Notebook", 10, parse_date("2024-05-01")).await?;

    let csv = "product,date,quantity\n\
               Green Tea,2024-05-02,12\n\
               Notebook,2024-05-02,4\n\
               Green Tea,2024-05-03T15:30:00+09:00,6\n";

    let result = Importer::new(&service)
        .import_sales_csv("may.csv", csv.as_bytes(), ImportOptions::default())
        .await?;

    assert!(result.is_ok());
    assert_eq!(result.imported, 3);
    let sales_file = result.sales_file.expect("sales file recorded");
    assert_eq!(sales_file.row_count, 3);

    assert_eq!(service.stock_on_hand("Green Tea").await?, 30);
    assert_eq!(service.stock_on_hand("Notebook").await?, 6);

    let files = service.list_sales_files().await?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name, "may.csv");
    assert_eq!(files[0].id, sales_file.id);

    Ok(())
}

#[tokio::test]
async fn test_import_is_all_or_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardProducts::create_basic(&service).await?;
    StandardProducts::stock(&service, "Green Tea", 10, parse_date("2024-05-01")).await?;

    let csv = "product,date,quantity\n\
               Green Tea,2024-05-02,4\n\
               Coffee,2024-05-02,1\n\
               Green Tea,not-a-date,1\n\
               Green Tea,2024-05-03,abc\n";

    let result = Importer::new(&service)
        .import_sales_csv("bad.csv", csv.as_bytes(), ImportOptions::default())
        .await?;

    assert!(!result.is_ok());
    assert_eq!(result.imported, 0);
    assert!(result.sales_file.is_none());

    let lines: Vec<usize> = result.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![3, 4, 5]);
    assert_eq!(result.errors[0].field.as_deref(), Some("product"));
    assert_eq!(result.errors[1].field.as_deref(), Some("date"));

    // The valid first row was not written either
    assert_eq!(service.stock_on_hand("Green Tea").await?, 10);
    assert!(service.list_sales_files().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_import_checks_stock_across_rows() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardProducts::create_basic(&service).await?;
    StandardProducts::stock(&service, "Stapler", 5, parse_date("2024-05-01")).await?;

    // Each row fits on its own, together they oversell
    let csv = "product,date,quantity\n\
               Stapler,2024-05-02,3\n\
               Stapler,2024-05-03,3\n";

    let result = Importer::new(&service)
        .import_sales_csv("stapler.csv", csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].line, 3);
    assert_eq!(service.stock_on_hand("Stapler").await?, 5);

    Ok(())
}

#[tokio::test]
async fn test_import_dry_run() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardProducts::create_basic(&service).await?;
    StandardProducts::stock(&service, "Notebook", 10, parse_date("2024-05-01")).await?;

    let csv = "product,date,quantity\nNotebook,2024-05-02,2\n";

    let result = Importer::new(&service)
        .import_sales_csv(
            "preview.csv",
            csv.as_bytes(),
            ImportOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .await?;

    assert!(result.is_ok());
    assert_eq!(result.imported, 1);
    assert!(result.sales_file.is_none());
    assert_eq!(service.stock_on_hand("Notebook").await?, 10);

    Ok(())
}

#[tokio::test]
async fn test_imported_sales_appear_in_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardProducts::create_basic(&service).await?;
    StandardProducts::stock(&service, "Stapler", 8, parse_date("2024-05-01")).await?;

    let csv = "product,date,quantity\nStapler,2024-05-04,5\n";
    Importer::new(&service)
        .import_sales_csv("stapler.csv", csv.as_bytes(), ImportOptions::default())
        .await?;

    let ledger = service.reload_ledger("Stapler").await?;
    assert_eq!(ledger.entries.len(), 2);
    assert_eq!(ledger.entries[0].balance, 3);
    assert_eq!(ledger.entries[0].line_value, 6000);
    Ok(())
}

#[tokio::test]
async fn test_import_error_lines_follow_physical_lines() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardProducts::create_basic(&service).await?;
    StandardProducts::stock(&service, "Notebook", 10, parse_date("2024-05-01")).await?;

    // Blank lines and a quoted field spanning two lines
    let csv = "product,date,quantity\n\
               \n\
               Notebook,2024-05-02,1\n\
               \"Green\nTea\",2024-05-02,1\n\
               \n\
               Coffee,2024-05-02,1\n";

    let result = Importer::new(&service)
        .import_sales_csv("spread.csv", csv.as_bytes(), ImportOptions::default())
        .await?;

    let lines: Vec<usize> = result.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![4, 7]);
    Ok(())
}

#[tokio::test]
async fn test_import_error_lines_with_crlf() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardProducts::create_basic(&service).await?;

    let csv = "product,date,quantity\r\nCoffee,2024-05-02,1\r\n\r\nTea,2024-05-02,1\r\n";

    let result = Importer::new(&service)
        .import_sales_csv("windows.csv", csv.as_bytes(), ImportOptions::default())
        .await?;

    let lines: Vec<usize> = result.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![2, 4]);
    Ok(())
}
